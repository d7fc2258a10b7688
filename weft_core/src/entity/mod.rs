// SeaORM entities for the posting core: users, communities, membership,
// and the thread table whose parent_id self-reference carries the reply tree.

pub mod community;
pub mod community_member;
pub mod thread;
pub mod user;


pub mod prelude {
    pub use super::community::{
        ActiveModel as CommunityActiveModel, Column as CommunityColumn, Entity as Community,
        Model as CommunityModel,
    };
    pub use super::community_member::{
        ActiveModel as CommunityMemberActiveModel, Column as CommunityMemberColumn,
        Entity as CommunityMember, Model as CommunityMemberModel,
    };
    pub use super::thread::{
        ActiveModel as ThreadActiveModel, Column as ThreadColumn, Entity as Thread,
        Model as ThreadModel,
    };
    pub use super::user::{
        ActiveModel as UserActiveModel, Column as UserColumn, Entity as User, Model as UserModel,
    };

    // Re-export commonly used SeaORM types and traits
    pub use sea_orm::{
        ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, Database, DatabaseConnection,
        DbConn, DbErr, EntityTrait, ModelTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder,
        QuerySelect, Related, RelationTrait, Select, Set, Unchanged,
    };
}
