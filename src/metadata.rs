mod internal;

pub use internal::{MetadataStore, MetadataStoreImpl};
