//! Remote operations on a single entity.

use super::Entity;
use crate::error::ModelResult;
use resorm_codec::{Payload, Value};
use resorm_transport::{ApiResponse, Method, Request};
use tracing::debug;

impl Entity {
    /// Saves the changed attributes.
    ///
    /// POSTs to the create URL while the entity is new, PATCHes the patch
    /// URL otherwise. Remote failures are returned as unsuccessful
    /// responses; only template and payload errors fail the call.
    pub async fn save(&mut self) -> ModelResult<ApiResponse> {
        self.save_with_data(Payload::new()).await
    }

    /// Saves the changed attributes merged with `extra`. Keys of `extra`
    /// win on collision.
    ///
    /// On success the entity-keyed payload of the response is loaded, the
    /// entity stops being new, the snapshot is re-baselined and validation
    /// errors are cleared. On failure the response's validation errors
    /// replace the entity's and attributes are left untouched.
    pub async fn save_with_data(&mut self, extra: Payload) -> ModelResult<ApiResponse> {
        let mut payload = self.changed_attributes()?;
        payload.extend(extra);

        let request = if self.is_new {
            Request::new(Method::Post, self.create_url()?)
        } else {
            Request::new(Method::Patch, self.patch_url()?)
        }
        .with_data(payload);

        debug!(
            record = %self.record.name(),
            method = %request.method,
            endpoint = %request.endpoint,
            "saving entity"
        );
        self.is_loading = true;
        let response = self.transport.send(request).await;
        let applied = self.apply_save_response(&response);
        self.is_loading = false;
        applied.map(|()| response)
    }

    /// Saves through another entity sharing this one's identity.
    ///
    /// Both entities first load each other's serialized state, the URL
    /// templates are copied onto `extra`, and `extra`'s full state is sent
    /// as extra data.
    pub async fn save_with_entity(&mut self, extra: &mut Entity) -> ModelResult<ApiResponse> {
        self.load(&Value::Map(extra.to_json()?))?;
        extra.load(&Value::Map(self.to_json()?))?;
        extra.set_create_url_format(self.create_url_format.clone());
        extra.set_patch_url_format(self.patch_url_format.clone());

        let data = extra.to_json()?;
        self.save_with_data(data).await
    }

    fn apply_save_response(&mut self, response: &ApiResponse) -> ModelResult<()> {
        if !response.is_successful() {
            self.load_validation_errors(response.validation_errors());
            return Ok(());
        }
        if let Some(data) = response.data(self.record.name()) {
            self.load(data)?;
        }
        self.is_new = false;
        self.reset_snapshot();
        self.validation_errors.clear();
        Ok(())
    }

    /// Refreshes the entity from its patch URL, with `extra` as query data.
    pub async fn fetch(&mut self, extra: Payload) -> ModelResult<ApiResponse> {
        let endpoint = self.patch_url()?;
        debug!(record = %self.record.name(), endpoint = %endpoint, "fetching entity");

        self.is_loading = true;
        let response = self.transport.get(&endpoint, extra).await;
        let applied = match response.data(self.record.name()) {
            Some(data) if response.is_successful() => self.load(data),
            _ => Ok(()),
        };
        self.is_loading = false;
        applied.map(|()| response)
    }

    /// Deletes the remote record. Local state is not touched.
    pub async fn delete(&mut self, extra: Payload) -> ModelResult<ApiResponse> {
        let endpoint = self.patch_url()?;
        debug!(record = %self.record.name(), endpoint = %endpoint, "deleting entity");

        self.is_loading = true;
        let response = self.transport.delete(&endpoint, extra).await;
        self.is_loading = false;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_records::{profile, transport, user};
    use resorm_codec::{Payload, Value};
    use resorm_transport::{ApiResponse, Method};

    #[tokio::test]
    async fn saving_a_new_entity_posts_changes_and_adopts_the_key() {
        let (mock, transport) = transport();
        mock.push_response(
            ApiResponse::success()
                .with_data("user", Value::map([("id", Value::from(7)), ("user_name", Value::from("x"))])),
        );

        let mut entity = user().make(&transport);
        entity.set_create_url_format("users");
        entity.set_attribute("user_name", "x").unwrap();
        let response = entity.save().await.unwrap();

        assert!(response.is_successful());
        assert!(!entity.is_new());
        assert!(!entity.is_loading());
        assert!(!entity.has_changed());
        assert_eq!(entity.get_attribute("id").unwrap(), &Value::Integer(7));

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.endpoint, "users");
        assert_eq!(request.data.len(), 1);
        assert_eq!(request.data["user_name"], Value::from("x"));
    }

    #[tokio::test]
    async fn existing_entities_patch_only_what_changed() {
        let (mock, transport) = transport();
        mock.push_response(ApiResponse::success());

        let mut entity = user()
            .make_from(
                &transport,
                &Value::map([("id", Value::from(3)), ("user_name", Value::from("a"))]),
            )
            .unwrap();
        entity.set_attribute("user_age", 41).unwrap();

        let mut extra = Payload::new();
        extra.insert("user_age".into(), Value::from(42));
        extra.insert("notify".into(), Value::Bool(true));
        entity.save_with_data(extra).await.unwrap();

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.endpoint, "admin/user/3");
        assert_eq!(request.data["user_age"], Value::Integer(42));
        assert_eq!(request.data["notify"], Value::Bool(true));
        assert!(!request.data.contains_key("user_name"));
        assert!(!entity.has_changed());
    }

    #[tokio::test]
    async fn failed_save_keeps_attributes_and_records_errors() {
        let (mock, transport) = transport();
        mock.push_response(
            ApiResponse::failure("E-VALIDATION", "Invalid data")
                .with_validation_error("user_name", "is required")
                .with_validation_error("user_age", "must be positive"),
        );

        let mut entity = user().make(&transport);
        entity.add_validation_error("active", "stale");
        entity.set_attribute("user_age", -1).unwrap();
        let response = entity.save().await.unwrap();

        assert!(!response.is_successful());
        assert!(entity.is_new());
        assert!(entity.has_changed());
        assert_eq!(entity.get_attribute("user_age").unwrap(), &Value::Integer(-1));
        assert_eq!(entity.validation_error("UserName"), Some("is required"));
        assert_eq!(entity.validation_error("UserAge"), Some("must be positive"));
        assert_eq!(entity.validation_error("Active"), None);
    }

    #[tokio::test]
    async fn successful_save_clears_validation_errors() {
        let (mock, transport) = transport();
        mock.push_response(ApiResponse::success());

        let mut entity = user().make(&transport);
        entity.add_validation_error("user_name", "required");
        entity.save().await.unwrap();
        assert!(!entity.has_validation_errors());
        assert!(!entity.is_new());
    }

    #[tokio::test]
    async fn transport_failure_is_a_value() {
        let (_, transport) = transport();
        let mut entity = user().make(&transport);
        let response = entity.save().await.unwrap();
        assert!(!response.is_successful());
        assert!(!entity.is_loading());
    }

    #[tokio::test]
    async fn saving_through_a_related_entity_shares_state() {
        let (mock, transport) = transport();
        mock.push_response(ApiResponse::success());

        let mut account = user()
            .make_from(&transport, &Value::map([("id", 5)]))
            .unwrap();
        account.set_patch_url_format("accounts/{Id}");
        let mut details = profile().make(&transport);
        details.set_attribute("bio", "hello").unwrap();
        details.set_attribute("id", 5).unwrap();

        account.save_with_entity(&mut details).await.unwrap();

        assert_eq!(details.patch_url_format(), "accounts/{Id}");
        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.endpoint, "accounts/5");
        assert_eq!(request.data["bio"], Value::from("hello"));
        assert_eq!(request.data["id"], Value::Integer(5));
    }

    #[tokio::test]
    async fn fetch_loads_the_entity_keyed_payload() {
        let (mock, transport) = transport();
        mock.push_response(
            ApiResponse::success().with_data("user", Value::map([("id", Value::from(9)), ("user_age", Value::from(30))])),
        );

        let mut entity = user().make(&transport);
        entity.set_attribute("id", 9).unwrap();
        let mut extra = Payload::new();
        extra.insert("with".into(), Value::from("profile"));
        entity.fetch(extra).await.unwrap();

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.endpoint, "admin/user/9");
        assert_eq!(request.data["with"], Value::from("profile"));
        assert_eq!(entity.get_attribute("user_age").unwrap(), &Value::Integer(30));
        assert!(!entity.has_changed());
    }

    #[tokio::test]
    async fn delete_leaves_local_state_alone() {
        let (mock, transport) = transport();
        mock.push_response(ApiResponse::success());

        let mut entity = user()
            .make_from(&transport, &Value::map([("id", 4)]))
            .unwrap();
        entity.set_attribute("user_name", "pending").unwrap();
        let response = entity.delete(Payload::new()).await.unwrap();

        assert!(response.is_successful());
        assert_eq!(mock.last_request().unwrap().method, Method::Delete);
        assert_eq!(mock.last_request().unwrap().endpoint, "admin/user/4");
        assert_eq!(entity.get_attribute("user_name").unwrap(), &Value::from("pending"));
        assert!(entity.has_changed());
    }
}
