//! Wire types for the messages payload.
//!
//! Every type here implements [`Decode`](crate::codec::Decode) and
//! [`Encode`](crate::codec::Encode), plus serde's traits on top of them, so it can be read from
//! and written to JSON directly. Union types without a reliable discriminator
//! ([`content::ContentBlock`], [`content::Content`]) decode by trying each shape in a fixed order.
pub mod content;
pub mod media;
pub mod message;
pub mod response;
pub mod role;
pub mod tool;
