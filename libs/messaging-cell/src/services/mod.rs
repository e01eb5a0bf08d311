pub mod conversations;
pub mod delivery;
pub mod messages;

pub use conversations::{build_conversations, ConversationThread};
pub use delivery::deliver;
pub use messages::MessageService;
