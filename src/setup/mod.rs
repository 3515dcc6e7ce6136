pub mod cache_setup;
