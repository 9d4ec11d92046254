pub mod api_base_url;
