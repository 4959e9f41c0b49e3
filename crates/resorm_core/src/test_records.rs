//! Records shared by the unit tests.

use crate::record::{FieldKind, RecordInfo};
use crate::relation::{RelationDescriptor, Related};
use resorm_transport::{MockTransport, Transport};
use std::sync::{Arc, OnceLock};

pub(crate) fn user() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("user")
            .namespace("admin")
            .field("user_name", FieldKind::Text)
            .field("user_age", FieldKind::Integer)
            .field_with_default("active", FieldKind::Bool, true)
            .field("company_id", FieldKind::Integer)
            .relation(
                "profile",
                RelationDescriptor::has_one(|t| Related::Entity(profile().make(t))).nested_url(),
            )
            .belongs_to("company", |t| Related::Entity(company().make(t)))
            .relation(
                "posts",
                RelationDescriptor::has_many(|t| Related::Collection(post().collection(t)))
                    .nested_url(),
            )
            .has_many_through("tags", "user", |t| Related::Collection(tag().collection(t)))
            .relation(
                "broken",
                RelationDescriptor::has_many(|t| Related::Entity(post().make(t))),
            )
            .build()
    }))
}

pub(crate) fn post() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("post")
            .field("title", FieldKind::Text)
            .field("user_id", FieldKind::Any)
            .build()
    }))
}

pub(crate) fn profile() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("profile")
            .field("bio", FieldKind::Text)
            .field("user_id", FieldKind::Any)
            .build()
    }))
}

pub(crate) fn company() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("company")
            .table("companies")
            .field("name", FieldKind::Text)
            .build()
    }))
}

pub(crate) fn tag() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("tag")
            .field("label", FieldKind::Text)
            .field("user_id", FieldKind::Any)
            .field("type", FieldKind::Text)
            .build()
    }))
}

pub(crate) fn transport() -> (Arc<MockTransport>, Arc<dyn Transport>) {
    let mock = Arc::new(MockTransport::new());
    let transport: Arc<dyn Transport> = mock.clone();
    (mock, transport)
}
