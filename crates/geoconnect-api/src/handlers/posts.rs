//! Post API handlers
//!
//! Author: hephaex@gmail.com

use crate::audit::ClientInfo;
use crate::auth::{Identity, StatusResponse};
use crate::error::{ApiJson, ApiQuery, AppError};
use crate::posts::{ImageUpload, NewPost};
use crate::state::AppState;
use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use geoconnect_core::{BoundingBox, Location, Post};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

/// Geographic point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 37.5665)]
    pub lat: f64,
    #[schema(example = 126.978)]
    pub lon: f64,
}

impl From<GeoPoint> for Location {
    fn from(p: GeoPoint) -> Self {
        Location::new(p.lat, p.lon)
    }
}

impl From<Location> for GeoPoint {
    fn from(l: Location) -> Self {
        Self {
            lat: l.lat,
            lon: l.lon,
        }
    }
}

/// JSON post creation body
///
/// Any `user` field sent by the client is ignored.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    #[serde(default)]
    #[schema(example = "Foggy morning at the bridge")]
    pub message: String,
    pub location: GeoPoint,
    /// Pre-uploaded media URL
    #[serde(default)]
    pub url: Option<String>,
}

impl From<CreatePostRequest> for NewPost {
    fn from(req: CreatePostRequest) -> Self {
        NewPost {
            message: req.message,
            location: req.location.into(),
            url: req.url,
            image: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePostResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub id: String,
}

/// A post as returned by searches
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: String,
    pub user: String,
    pub message: String,
    pub location: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            user: post.user,
            message: post.message,
            location: post.location.into(),
            url: post.url,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RadiusQuery {
    /// Center latitude
    pub lat: f64,
    /// Center longitude
    pub lon: f64,
    /// Radius in kilometers (default 200); an empty value means the default
    #[serde(default, deserialize_with = "blank_as_none")]
    pub range: Option<f64>,
}

/// Web forms submit `range=` when the field is left blank
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid range: {value}"))),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AreaQuery {
    pub top_left_lat: f64,
    pub top_left_lon: f64,
    pub bottom_right_lat: f64,
    pub bottom_right_lon: f64,
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

fn parse_coordinate(name: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{name} must be a number")))
}

/// Collect `message`, `lat`, `lon` and `image` from a multipart form
async fn read_multipart(mut multipart: Multipart) -> Result<NewPost, AppError> {
    let mut message = String::new();
    let mut lat = None;
    let mut lon = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => message = field.text().await?,
            "lat" => lat = Some(parse_coordinate("lat", &field.text().await?)?),
            "lon" => lon = Some(parse_coordinate("lon", &field.text().await?)?),
            "image" => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let data = field.bytes().await?.to_vec();
                image = Some(ImageUpload { filename, data });
            }
            other => tracing::debug!(field = other, "Ignoring multipart field"),
        }
    }

    let (Some(lat), Some(lon)) = (lat, lon) else {
        return Err(AppError::BadRequest("lat and lon are required".to_string()));
    };
    let image = image
        .filter(|i| !i.data.is_empty())
        .ok_or_else(|| AppError::BadRequest("image is required".to_string()))?;

    Ok(NewPost {
        message,
        location: Location::new(lat, lon),
        url: None,
        image: Some(image),
    })
}

/// Create a post
///
/// Accepts JSON, or a multipart form carrying `message`, `lat`, `lon` and an
/// `image` file. The author is always the authenticated caller.
#[utoipa::path(
    post,
    path = "/post",
    tag = "posts",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Post created", body = CreatePostResponse),
        (status = 400, description = "Invalid post", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let draft = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        read_multipart(multipart).await?
    } else {
        let ApiJson(body) = ApiJson::<CreatePostRequest>::from_request(request, &state).await?;
        body.into()
    };

    let post = state.posts.create(&identity, draft).await?;

    Ok(Json(CreatePostResponse {
        status: "ok".to_string(),
        id: post.id,
    }))
}

/// Posts within a radius of a point, nearest first
#[utoipa::path(
    get,
    path = "/search",
    tag = "posts",
    params(RadiusQuery),
    responses(
        (status = 200, description = "Matching posts", body = Vec<PostResponse>),
        (status = 400, description = "Invalid coordinates or range", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_posts(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
    ApiQuery(query): ApiQuery<RadiusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let posts = state
        .posts
        .search_radius(Location::new(query.lat, query.lon), query.range)
        .await?;

    Ok(Json(
        posts.into_iter().map(PostResponse::from).collect::<Vec<_>>(),
    ))
}

/// Posts inside a bounding box
#[utoipa::path(
    get,
    path = "/search/area",
    tag = "posts",
    params(AreaQuery),
    responses(
        (status = 200, description = "Matching posts", body = Vec<PostResponse>),
        (status = 400, description = "Invalid bounding box", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_area(
    State(state): State<Arc<AppState>>,
    _identity: Identity,
    ApiQuery(query): ApiQuery<AreaQuery>,
) -> Result<impl IntoResponse, AppError> {
    let area = BoundingBox::new(
        Location::new(query.top_left_lat, query.top_left_lon),
        Location::new(query.bottom_right_lat, query.bottom_right_lon),
    )?;
    let posts = state.posts.search_area(area).await?;

    Ok(Json(
        posts.into_iter().map(PostResponse::from).collect::<Vec<_>>(),
    ))
}

/// Delete a post owned by the caller (admins may delete any post)
#[utoipa::path(
    delete,
    path = "/post/{id}",
    tag = "posts",
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post deleted", body = StatusResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ApiError),
        (status = 403, description = "Caller is neither author nor admin", body = crate::error::ApiError),
        (status = 404, description = "Post not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    state.posts.delete(&identity, &id, &client).await?;

    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_is_multipart() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("Multipart/Form-Data; boundary=xyz"),
        );
        assert!(is_multipart(&headers));

        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_multipart(&headers));
    }

    #[test]
    fn test_create_request_ignores_user_field() {
        let body = r#"{"user":"mallory","message":"hi","location":{"lat":1.0,"lon":2.0}}"#;
        let req: CreatePostRequest = serde_json::from_str(body).unwrap();
        let draft = NewPost::from(req);

        assert_eq!(draft.message, "hi");
        assert_eq!(draft.location, Location::new(1.0, 2.0));
    }

    #[test]
    fn test_radius_query_blank_range() {
        let query: RadiusQuery =
            serde_json::from_str(r#"{"lat":1.0,"lon":2.0,"range":""}"#).unwrap();
        assert_eq!(query.range, None);

        let query: RadiusQuery = serde_json::from_str(r#"{"lat":1.0,"lon":2.0}"#).unwrap();
        assert_eq!(query.range, None);

        let query: RadiusQuery =
            serde_json::from_str(r#"{"lat":1.0,"lon":2.0,"range":" 50 "}"#).unwrap();
        assert_eq!(query.range, Some(50.0));

        let bad = r#"{"lat":1.0,"lon":2.0,"range":"far"}"#;
        assert!(serde_json::from_str::<RadiusQuery>(bad).is_err());
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("lat", " 12.5 ").unwrap(), 12.5);
        assert!(matches!(
            parse_coordinate("lat", "north"),
            Err(AppError::BadRequest(_))
        ));
    }
}
