pub mod owner;
pub mod short_url;

pub use owner::Entity as OwnerEntity;
pub use short_url::Entity as ShortUrlEntity;
