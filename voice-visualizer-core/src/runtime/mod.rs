pub mod clock;
pub mod completion;
pub mod scheduler;
