//! Record fixtures and API helpers.
//!
//! The fixture schema is a small blog: users own posts, have one profile,
//! belong to a company and carry tags through a discriminated join.

use crate::backend::InMemoryBackend;
use resorm_codec::{Payload, Value};
use resorm_core::{Collection, Entity, FieldKind, RecordInfo, Related, RelationDescriptor};
use resorm_transport::Transport;
use std::sync::{Arc, OnceLock};

/// `user` records, under the `api` namespace.
///
/// Relations: `profile` (has-one, nested create URL), `company`
/// (belongs-to), `posts` (has-many, nested list URL) and `tags`
/// (has-many-through, discriminator `user`).
pub fn user_record() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("user")
            .namespace("api")
            .field("name", FieldKind::Text)
            .field("email", FieldKind::Text)
            .field("age", FieldKind::Integer)
            .field_with_default("active", FieldKind::Bool, true)
            .field("company_id", FieldKind::Integer)
            .relation(
                "profile",
                RelationDescriptor::has_one(|t| Related::Entity(profile_record().make(t)))
                    .nested_url(),
            )
            .belongs_to("company", |t| Related::Entity(company_record().make(t)))
            .relation(
                "posts",
                RelationDescriptor::has_many(|t| Related::Collection(post_record().collection(t)))
                    .nested_url(),
            )
            .has_many_through("tags", "user", |t| {
                Related::Collection(tag_record().collection(t))
            })
            .build()
    }))
}

/// `post` records.
pub fn post_record() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("post")
            .field("title", FieldKind::Text)
            .field("body", FieldKind::Text)
            .field("views", FieldKind::Integer)
            .field("user_id", FieldKind::Integer)
            .build()
    }))
}

/// `profile` records.
pub fn profile_record() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("profile")
            .field("bio", FieldKind::Text)
            .field("user_id", FieldKind::Integer)
            .build()
    }))
}

/// `company` records, stored in `companies`.
pub fn company_record() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("company")
            .table("companies")
            .field("name", FieldKind::Text)
            .build()
    }))
}

/// `tag` records. Rows are shared between owners and told apart by `type`.
pub fn tag_record() -> Arc<RecordInfo> {
    static RECORD: OnceLock<Arc<RecordInfo>> = OnceLock::new();
    Arc::clone(RECORD.get_or_init(|| {
        RecordInfo::builder("tag")
            .field("label", FieldKind::Text)
            .field("user_id", FieldKind::Integer)
            .field("type", FieldKind::Text)
            .build()
    }))
}

/// A backend serving every fixture resource.
///
/// Users require `name` and `email`, posts require `title`.
pub fn fixture_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_resource("user", "users", &["name", "email"])
        .with_resource("post", "posts", &["title"])
        .with_resource("profile", "profiles", &[])
        .with_resource("company", "companies", &["name"])
        .with_resource("tag", "tags", &[])
}

/// Builds a payload from `(key, value)` pairs.
pub fn payload<K, V, I>(pairs: I) -> Payload
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A fixture backend together with a transport talking to it.
pub struct TestApi {
    /// The backend, for seeding and inspection.
    pub backend: Arc<InMemoryBackend>,
    /// The same backend as a transport.
    pub transport: Arc<dyn Transport>,
}

impl TestApi {
    /// Creates an API over a fresh [`fixture_backend`].
    pub fn new() -> Self {
        Self::with_backend(fixture_backend())
    }

    /// Creates an API over a custom backend.
    pub fn with_backend(backend: InMemoryBackend) -> Self {
        let backend = Arc::new(backend);
        let transport: Arc<dyn Transport> = backend.clone();
        Self { backend, transport }
    }

    /// A fresh user entity.
    pub fn user(&self) -> Entity {
        user_record().make(&self.transport)
    }

    /// A fresh post entity.
    pub fn post(&self) -> Entity {
        post_record().make(&self.transport)
    }

    /// An empty user collection.
    pub fn users(&self) -> Collection {
        user_record().collection(&self.transport)
    }

    /// An empty post collection.
    pub fn posts(&self) -> Collection {
        post_record().collection(&self.transport)
    }

    /// Inserts a user row and returns its id.
    pub fn seed_user(&self, name: &str, age: i64) -> i64 {
        self.backend.insert(
            "users",
            payload([
                ("name", Value::from(name)),
                ("email", Value::from(format!("{name}@example.com"))),
                ("age", Value::from(age)),
                ("active", Value::Bool(true)),
            ]),
        )
    }

    /// Inserts `count` posts owned by `user_id`, titled `post 1..=count`
    /// with `views` equal to their index, and returns their ids.
    pub fn seed_posts(&self, user_id: i64, count: i64) -> Vec<i64> {
        (1..=count)
            .map(|n| {
                self.backend.insert(
                    "posts",
                    payload([
                        ("title", Value::from(format!("post {n}"))),
                        ("views", Value::from(n)),
                        ("user_id", Value::from(user_id)),
                    ]),
                )
            })
            .collect()
    }
}

impl Default for TestApi {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestApi {
    type Target = InMemoryBackend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}
