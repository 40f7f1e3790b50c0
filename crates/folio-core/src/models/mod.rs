pub mod media;

pub use media::{
    AssetListing, AssetMetadata, DerivativeDescriptor, DerivativeLink, DerivativeSet, Encoding,
    StoredOriginal,
};
