pub mod bundle;
pub mod profile;
pub mod share_link;

pub use bundle::write_bundle;
pub use profile::write_profile;
pub use share_link::write_share_links;
