pub mod chat;
pub mod store;

pub use chat::ChatBookingAdapter;
pub use store::{
    conversation_store_from_config, ConversationStore, InMemoryConversationStore,
    RedisConversationStore,
};
