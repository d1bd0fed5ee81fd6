//! Media module: saved posts, classification and resolution.

pub mod item;
pub mod parser;
pub mod resolver;

pub use item::{GalleryImage, PostKind, ResolvedMedia, SavedPost};
pub use parser::{classify, parse_listing, posts_from_listing};
pub use resolver::MediaResolver;
