pub use entity_api::group::{add_member, create, find_by_id, find_member_ids, is_member};
