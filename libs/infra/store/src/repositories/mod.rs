pub mod credits;
pub mod jobs;
pub mod users;
pub mod workers;

pub use credits::CreditsRepository;
pub use jobs::JobsRepository;
pub use users::UsersRepository;
pub use workers::WorkersRepository;
