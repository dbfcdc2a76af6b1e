//! Test harness for the storefront router.
//!
//! [`TestApp`] builds the full application over an in-memory record store
//! and session store, then drives it request by request with
//! `tower::ServiceExt::oneshot`, carrying the session cookie between calls
//! the way a browser would.
//!
//! ```rust,ignore
//! let mut app = TestApp::new();
//! app.register("alice@example.com").await;
//! let page = app.get("/").await;
//! assert_eq!(page.status, StatusCode::OK);
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use tower::ServiceExt;
use uuid::Uuid;

use product_manager_core::{Email, ProductId, UserId};
use product_manager_storefront::config::StorefrontConfig;
use product_manager_storefront::db::{MemoryStore, ProductStore, UserStore};
use product_manager_storefront::middleware::session_layer;
use product_manager_storefront::middleware::session::SESSION_COOKIE_NAME;
use product_manager_storefront::routes;
use product_manager_storefront::state::AppState;

/// Password used by [`TestApp::register`].
pub const TEST_PASSWORD: &str = "correct horse battery";

const MULTIPART_BOUNDARY: &str = "----product-manager-test-boundary";

/// A response with its body read to a string.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// `Location` header of a redirect.
    pub location: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

/// One part of a multipart form.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
}

/// The storefront under test with one browser-like client.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub media_root: PathBuf,
    cookie: Option<String>,
    owns_media: bool,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Build the app with empty stores and a fresh media directory.
    #[must_use]
    pub fn new() -> Self {
        let media_root = std::env::temp_dir().join(format!("pm-test-media-{}", Uuid::new_v4()));
        let media = media_root.to_string_lossy().into_owned();

        let config = StorefrontConfig::from_source(&|key: &str| match key {
            "STOREFRONT_DATABASE_URL" => Some("postgres://localhost/unused".to_owned()),
            "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_owned()),
            "STOREFRONT_MEDIA_ROOT" => Some(media.clone()),
            _ => None,
        })
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(config, store.clone());
        let router = routes::app(
            state,
            session_layer(tower_sessions::MemoryStore::default(), false),
        );

        Self {
            router,
            store,
            media_root,
            cookie: None,
            owns_media: true,
        }
    }

    /// A second client against the same application and stores.
    #[must_use]
    pub fn other_client(&self) -> Self {
        Self {
            router: self.router.clone(),
            store: self.store.clone(),
            media_root: self.media_root.clone(),
            cookie: None,
            owns_media: false,
        }
    }

    /// Register `email` with [`TEST_PASSWORD`]; the client is logged in
    /// afterwards.
    pub async fn register(&mut self, email: &str) -> TestResponse {
        let response = self
            .post_form(
                "/auth/register",
                &[
                    ("email", email),
                    ("password", TEST_PASSWORD),
                    ("password_confirm", TEST_PASSWORD),
                ],
            )
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
        response
    }

    /// Create a product through the form and return its id.
    pub async fn create_product(
        &mut self,
        name: &str,
        slug: &str,
        price: &str,
        specs: &[(&str, &str)],
    ) -> ProductId {
        let fields = new_spec_fields(specs);
        let response = self
            .post_multipart("/products/new", &product_parts(name, slug, price, &fields))
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{}", response.body);
        self.product_id(slug).await
    }

    /// Id of the stored product with `slug`.
    pub async fn product_id(&self, slug: &str) -> ProductId {
        self.store
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.slug.as_str() == slug)
            .map(|p| p.id)
            .unwrap()
    }

    /// Id of the registered user with `email`.
    pub async fn user_id(&self, email: &str) -> UserId {
        let email = Email::parse(email).unwrap();
        let (user, _) = self.store.get_user_with_password(&email).await.unwrap().unwrap();
        user.id
    }

    /// Send a GET request.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// Send a POST with no body.
    pub async fn post(&mut self, path: &str) -> TestResponse {
        self.post_form(path, &[]).await
    }

    /// Send a url-encoded form.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Send a multipart form.
    pub async fn post_multipart(&mut self, path: &str, parts: &[Part<'_>]) -> TestResponse {
        let request = self
            .request("POST", path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        self.send(request).await
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        for value in response.headers().get_all(header::SET_COOKIE) {
            self.store_cookie(value.to_str().unwrap());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let location = headers
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_owned());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            location,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn store_cookie(&mut self, set_cookie: &str) {
        let Some(pair) = set_cookie.split(';').next() else {
            return;
        };
        let Some((name, value)) = pair.split_once('=') else {
            return;
        };
        if name.trim() != SESSION_COOKIE_NAME {
            return;
        }
        let expired = set_cookie.to_ascii_lowercase().contains("max-age=0");
        self.cookie = if value.is_empty() || expired {
            None
        } else {
            Some(pair.trim().to_owned())
        };
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if self.owns_media {
            let _ = std::fs::remove_dir_all(&self.media_root);
        }
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Multipart parts for a product with the given spec rows.
#[must_use]
pub fn product_parts<'a>(
    name: &'a str,
    slug: &'a str,
    price: &'a str,
    specs: &'a [(String, String)],
) -> Vec<Part<'a>> {
    let mut parts = vec![
        Part::Text("name", name),
        Part::Text("slug", slug),
        Part::Text("description", "Created by a test"),
        Part::Text("price", price),
    ];
    for (field, value) in specs {
        parts.push(Part::Text(field.as_str(), value.as_str()));
    }
    parts
}

/// Formset fields for new rows, including `specs-TOTAL_FORMS`.
#[must_use]
pub fn new_spec_fields(rows: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut fields = vec![("specs-TOTAL_FORMS".to_owned(), rows.len().to_string())];
    for (index, (key, value)) in rows.iter().enumerate() {
        fields.push((format!("specs-{index}-key_name"), (*key).to_owned()));
        fields.push((format!("specs-{index}-value"), (*value).to_owned()));
    }
    fields
}
