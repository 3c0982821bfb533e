pub mod fixture;
pub mod provider;
pub mod tradestie;
pub mod types;

pub use fixture::FixtureProvider;
pub use provider::SentimentProvider;
pub use tradestie::TradestieProvider;
