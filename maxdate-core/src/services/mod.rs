pub mod accounts;
pub mod credentials;
pub mod feed;
pub mod matches;
pub mod matching;
pub mod photos;
pub mod profiles;

pub use accounts::AccountService;
pub use feed::FeedSelector;
pub use matches::MatchService;
pub use matching::MatchingEngine;
pub use photos::PhotoService;
pub use profiles::ProfileService;
