pub mod paddle;
