pub mod api;
pub mod slack;

pub use api::ApiClient;
pub use slack::SlackClient;
