pub mod api_base_url;

pub use api_base_url::{default_api_base_url, get_api_base_url, set_api_base_url};
