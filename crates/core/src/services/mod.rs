//! Business logic services.

pub mod comment;
pub mod event_publisher;
pub mod like;
pub mod notification;
pub mod post;
pub mod user;

pub use comment::{CommentDetail, CommentService, CreateCommentInput};
pub use event_publisher::{
    ChannelMessage, EventPublisher, EventPublisherService, NoOpEventPublisher, PostUpdated,
    RealtimeEvent,
};
pub use like::{LikeService, LikeToggle};
pub use notification::{ActorView, NotificationService, NotificationView};
pub use post::{CreatePostInput, PostDetail, PostService, RepostOutcome};
pub use user::UserService;
