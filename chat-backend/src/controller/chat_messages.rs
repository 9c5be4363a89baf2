//! `/api/chat-messages`: create and list chat messages.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Controller, Error, RestController};
use crate::config::{get_config, Pagination};
use crate::http::{Request, Response};
use crate::model::{ChatMessage, ChatMessageService, Pageable};

/// Create request body. Anything besides these two fields,
/// `id` and `createdAt` included, is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateChatMessage {
    message: Option<String>,
    user_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldError {
    object_name: &'static str,
    field: &'static str,
    message: &'static str,
}

impl FieldError {
    fn not_null(field: &'static str) -> Self {
        Self {
            object_name: "chatMessage",
            field,
            message: "NotNull",
        }
    }
}

/// Body of a `400` caused by missing fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationProblem {
    title: &'static str,
    status: u16,
    message: &'static str,
    field_errors: Vec<FieldError>,
}

impl CreateChatMessage {
    /// Both fields are required. Empty strings are fine.
    fn validate(self) -> Result<(String, String), ValidationProblem> {
        match (self.message, self.user_name) {
            (Some(message), Some(user_name)) => Ok((message, user_name)),
            (message, user_name) => {
                let mut field_errors = vec![];

                if message.is_none() {
                    field_errors.push(FieldError::not_null("message"));
                }

                if user_name.is_none() {
                    field_errors.push(FieldError::not_null("userName"));
                }

                Err(ValidationProblem {
                    title: "Method argument not valid",
                    status: 400,
                    message: "error.validation",
                    field_errors,
                })
            }
        }
    }
}

/// REST controller for chat messages.
pub struct ChatMessageController {
    service: ChatMessageService,
    pagination: Pagination,
}

impl ChatMessageController {
    /// Pagination defaults come from the `[pagination]` configuration section.
    pub fn new(service: ChatMessageService) -> Self {
        Self {
            service,
            pagination: get_config().pagination.clone(),
        }
    }

    /// Use different pagination defaults.
    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// The server's receipt time, at the precision the database keeps.
    fn accepted_at(request: &Request) -> OffsetDateTime {
        let at = request.received_at();
        at.replace_nanosecond(at.nanosecond() / 1_000 * 1_000)
            .unwrap_or(at)
    }
}

#[async_trait]
impl Controller for ChatMessageController {
    async fn handle(&self, request: &Request) -> Result<Response, Error> {
        self.dispatch(request).await
    }
}

#[async_trait]
impl RestController for ChatMessageController {
    type Resource = i64;

    /// `GET /api/chat-messages?page=&size=&sort=`
    async fn list(&self, request: &Request) -> Result<Response, Error> {
        let pageable = Pageable::from_query(request.query(), &self.pagination);
        let page = self.service.find_all(&pageable).await?;

        let response = if self.pagination.total_count_header {
            Response::new()
                .header("x-total-count", page.total_elements())
                .header("x-total-pages", page.total_pages())
        } else {
            Response::new()
        };

        Ok(response.json(page.content())?)
    }

    /// `GET /api/chat-messages/:id`
    async fn get(&self, _request: &Request, id: &i64) -> Result<Response, Error> {
        match self.service.find_one(*id).await? {
            Some(message) => Ok(Response::new().json(message)?),
            None => Ok(Response::not_found()),
        }
    }

    /// `POST /api/chat-messages`
    async fn create(&self, request: &Request) -> Result<Response, Error> {
        // Only a JSON object is a valid body.
        let body = match request.json_raw() {
            Ok(body) if body.is_object() => body,
            _ => return Ok(Response::bad_request()),
        };

        let create = match serde_json::from_value::<CreateChatMessage>(body) {
            Ok(create) => create,
            Err(_) => return Ok(Response::bad_request()),
        };

        let (message, user_name) = match create.validate() {
            Ok(fields) => fields,
            Err(problem) => return Ok(Response::new().json(problem)?.code(400)),
        };

        let message = ChatMessage::new(message, user_name, Self::accepted_at(request));
        let message = self.service.save(message).await?;

        let id = match message.id {
            Some(id) => id,
            None => return Err(crate::model::Error::NoRows("saved chat message has no id").into()),
        };

        let location = format!("{}/{}", request.path().trim_end_matches('/'), id);

        Ok(Response::new()
            .json(message)?
            .code(201)
            .header("location", location))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use time::format_description::well_known::Rfc3339;

    use super::*;
    use crate::http::request::test::{get, post_json, request};
    use crate::http::Router;
    use crate::model::MemoryRepository;

    struct Api {
        router: Router,
        repository: MemoryRepository,
    }

    impl Api {
        fn new() -> Self {
            Self::with_pagination(Pagination::default())
        }

        fn with_pagination(pagination: Pagination) -> Self {
            let repository = MemoryRepository::new();
            let service = ChatMessageService::new(Arc::new(repository.clone()));

            Self {
                router: Router::new(vec![ChatMessageController::new(service)
                    .pagination(pagination)
                    .rest("/api/chat-messages")])
                .unwrap(),
                repository,
            }
        }

        async fn send(&self, request: Request) -> Response {
            let (handler, id) = self.router.find(request.path()).expect("route");
            handler.controller().handle_internal(&request.with_id(id)).await
        }

        async fn create(&self, message: &str, user_name: &str) -> Value {
            let body = json!({"message": message, "userName": user_name}).to_string();
            let response = self.send(post_json("/api/chat-messages", &body).await).await;
            assert_eq!(response.status(), 201);
            body_json(&response)
        }
    }

    fn body_json(response: &Response) -> Value {
        serde_json::from_slice(response.body()).expect("JSON body")
    }

    fn ids(response: &Response) -> Vec<i64> {
        body_json(response)
            .as_array()
            .expect("JSON array")
            .iter()
            .filter_map(|message| message["id"].as_i64())
            .collect()
    }

    #[tokio::test]
    async fn test_create() {
        let api = Api::new();

        let request = post_json(
            "/api/chat-messages",
            r#"{"message": "hi", "userName": "alice"}"#,
        )
        .await;
        let received_at = request.received_at();

        let response = api.send(request).await;
        assert_eq!(response.status(), 201);
        assert_eq!(
            response.headers().get("location"),
            Some(&"/api/chat-messages/1".to_string())
        );
        assert_eq!(
            response.headers().get("content-type"),
            Some(&"application/json".to_string())
        );

        let body = body_json(&response);
        assert_eq!(body["id"], json!(1));
        assert_eq!(body["message"], json!("hi"));
        assert_eq!(body["userName"], json!("alice"));

        let created_at =
            OffsetDateTime::parse(body["createdAt"].as_str().unwrap(), &Rfc3339).unwrap();
        assert!((received_at - created_at).abs() < time::Duration::milliseconds(1));
        assert_eq!(created_at.nanosecond() % 1_000, 0);
        assert_eq!(api.repository.len(), 1);
    }

    #[tokio::test]
    async fn test_create_ignores_client_id_and_timestamp() {
        let api = Api::new();
        api.create("first", "alice").await;

        let response = api
            .send(
                post_json(
                    "/api/chat-messages",
                    r#"{"id": 1, "message": "hi", "userName": "bob", "createdAt": "1999-01-01T00:00:00Z", "extra": true}"#,
                )
                .await,
            )
            .await;

        assert_eq!(response.status(), 201);
        let body = body_json(&response);
        assert_eq!(body["id"], json!(2));
        assert_ne!(body["createdAt"], json!("1999-01-01T00:00:00Z"));

        let created_at =
            OffsetDateTime::parse(body["createdAt"].as_str().unwrap(), &Rfc3339).unwrap();
        assert!(created_at.year() > 1999);
    }

    #[tokio::test]
    async fn test_create_empty_strings() {
        let api = Api::new();
        let body = api.create("", "").await;
        assert_eq!(body["message"], json!(""));
        assert_eq!(body["userName"], json!(""));
    }

    #[tokio::test]
    async fn test_create_missing_fields() {
        let api = Api::new();

        let response = api
            .send(post_json("/api/chat-messages", r#"{"message": "hi"}"#).await)
            .await;
        assert_eq!(response.status(), 400);
        assert_eq!(
            body_json(&response),
            json!({
                "title": "Method argument not valid",
                "status": 400,
                "message": "error.validation",
                "fieldErrors": [
                    {"objectName": "chatMessage", "field": "userName", "message": "NotNull"}
                ]
            })
        );

        let response = api
            .send(post_json("/api/chat-messages", r#"{"message": null, "userName": null}"#).await)
            .await;
        assert_eq!(response.status(), 400);
        let fields = body_json(&response)["fieldErrors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|error| error["field"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(fields, vec!["message", "userName"]);

        assert!(api.repository.is_empty());
    }

    #[tokio::test]
    async fn test_create_malformed_body() {
        let api = Api::new();

        for body in [
            "",
            "not json",
            r#"["hi", "alice"]"#,
            r#""hi""#,
            r#"{"message": 5, "userName": "alice"}"#,
            r#"{"message": "hi", "userName": "alice"} trailing"#,
        ] {
            let response = api.send(post_json("/api/chat-messages", body).await).await;
            assert_eq!(response.status(), 400, "body: {}", body);
        }

        assert!(api.repository.is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_distinct() {
        let api = Api::new();
        let mut ids = vec![];

        for i in 0..10 {
            let body = api.create(&format!("message {}", i), "alice").await;
            ids.push(body["id"].as_i64().expect("id is set"));
        }

        let mut distinct = ids.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), ids.len());
    }

    #[tokio::test]
    async fn test_list() {
        let api = Api::new();

        let response = api.send(get("/api/chat-messages").await).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response), json!([]));
        assert!(response.headers().get("x-total-count").is_none());

        for (message, user_name) in [("one", "carol"), ("two", "alice"), ("three", "bob")] {
            api.create(message, user_name).await;
        }

        let response = api.send(get("/api/chat-messages?size=3").await).await;
        assert_eq!(ids(&response), vec![1, 2, 3]);
        let body = body_json(&response);
        let first = &body[0];
        assert_eq!(first["message"], json!("one"));
        assert_eq!(first["userName"], json!("carol"));

        let response = api.send(get("/api/chat-messages?sort=id,desc").await).await;
        assert_eq!(ids(&response), vec![3, 2, 1]);

        let response = api
            .send(get("/api/chat-messages?sort=userName&sort=id,desc").await)
            .await;
        assert_eq!(ids(&response), vec![2, 3, 1]);

        let response = api.send(get("/api/chat-messages?page=1&size=2").await).await;
        assert_eq!(ids(&response), vec![3]);

        let response = api
            .send(get("/api/chat-messages?page=-1&size=abc&sort=nope,desc").await)
            .await;
        assert_eq!(response.status(), 200);
        assert_eq!(ids(&response), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_create_then_list_newest_first() {
        let api = Api::new();
        api.create("older", "alice").await;

        let created = api.create("hi", "alice").await;
        let response = api.send(get("/api/chat-messages?sort=id,desc").await).await;

        let body = body_json(&response);
        let listed = &body[0];
        assert_eq!(listed["id"], created["id"]);
        assert_eq!(listed["createdAt"], created["createdAt"]);
    }

    #[tokio::test]
    async fn test_list_total_headers() {
        let api = Api::with_pagination(Pagination {
            total_count_header: true,
            ..Pagination::default()
        });

        for i in 0..5 {
            api.create(&i.to_string(), "alice").await;
        }

        let response = api.send(get("/api/chat-messages?size=2").await).await;
        assert_eq!(ids(&response), vec![1, 2]);
        assert_eq!(
            response.headers().get("x-total-count"),
            Some(&"5".to_string())
        );
        assert_eq!(
            response.headers().get("x-total-pages"),
            Some(&"3".to_string())
        );
    }

    #[tokio::test]
    async fn test_get() {
        let api = Api::new();
        let created = api.create("hi", "alice").await;

        let response = api.send(get("/api/chat-messages/1").await).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response), created);

        let response = api.send(get("/api/chat-messages/2").await).await;
        assert_eq!(response.status(), 404);

        let response = api.send(get("/api/chat-messages/abc").await).await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let api = Api::new();
        api.create("hi", "alice").await;

        for raw in [
            "DELETE /api/chat-messages/1 HTTP/1.1\r\n\r\n",
            "PUT /api/chat-messages/1 HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}",
            "PATCH /api/chat-messages/1 HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}",
            "DELETE /api/chat-messages HTTP/1.1\r\n\r\n",
            "POST /api/chat-messages/1 HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}",
        ] {
            let response = api.send(request(raw).await).await;
            assert_eq!(response.status(), 405, "request: {}", raw);
        }

        assert_eq!(api.repository.len(), 1);
    }

    #[tokio::test]
    async fn test_cors() {
        let api = Api::new();

        let response = api.send(get("/api/chat-messages").await).await;
        assert_eq!(
            response.headers().get("access-control-allow-origin"),
            Some(&"*".to_string())
        );

        let response = api
            .send(request("OPTIONS /api/chat-messages HTTP/1.1\r\nOrigin: http://localhost\r\n\r\n").await)
            .await;
        assert_eq!(response.status(), 204);
        assert_eq!(
            response.headers().get("access-control-allow-methods"),
            Some(&"GET, POST, OPTIONS".to_string())
        );
    }
}
