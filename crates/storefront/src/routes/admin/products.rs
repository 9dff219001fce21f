//! Admin product management: catalogue grid, create with images, edit.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopeasy_core::listing::{ListingQuery, lenient_page};
use shopeasy_core::{ProductDraft, ProductId, ValidationError};

use crate::api::ImageUpload;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, PageContext, RequireAdmin};
use crate::models::Flash;
use crate::routes::products::ProductCardView;
use crate::services::flash;
use crate::state::AppState;

/// Values shown in the product form.
#[derive(Clone, Default)]
pub struct ProductFormView {
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub stock: String,
}

impl From<ProductDraft> for ProductFormView {
    fn from(draft: ProductDraft) -> Self {
        Self {
            title: draft.title,
            description: draft.description,
            category: draft.category,
            price: draft.price.to_string(),
            stock: draft.stock.to_string(),
        }
    }
}

/// Admin grid pagination.
#[derive(Debug, Default, Deserialize)]
pub struct AdminPageQuery {
    #[serde(default, deserialize_with = "lenient_page")]
    pub page: u32,
}

/// Edit form data.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub stock: String,
}

/// Product grid and create form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub page: PageContext,
    pub active: &'static str,
    pub products: Vec<ProductCardView>,
    pub categories: Vec<String>,
    pub current_page: u32,
    pub total_pages: u32,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// Edit product form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_edit.html")]
pub struct AdminProductEditTemplate {
    pub page: PageContext,
    pub active: &'static str,
    pub id: String,
    pub form: ProductFormView,
    pub image: Option<String>,
}

fn admin_page_url(page: u32) -> String {
    if page <= 1 {
        "/admin".to_string()
    } else {
        format!("/admin?page={page}")
    }
}

fn edit_url(id: &str) -> String {
    format!("/admin/products/{}/edit", urlencoding::encode(id))
}

/// Display the paginated product grid with the create form.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAdmin(auth): RequireAdmin,
    Query(query): Query<AdminPageQuery>,
) -> Result<Response> {
    let requested = query.page.max(1);
    let listing = state
        .api()
        .products(&ListingQuery::new().with_page(requested, requested))
        .await?;

    let total_pages = listing.total_pages.max(1);
    if requested > total_pages {
        return Ok(Redirect::to(&admin_page_url(total_pages)).into_response());
    }

    let page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    Ok(AdminProductsTemplate {
        page,
        active: "products",
        products: listing
            .products
            .iter()
            .map(|p| ProductCardView::new(p, false))
            .collect(),
        categories: listing.categories,
        current_page: requested,
        total_pages,
        prev_url: (requested > 1).then(|| admin_page_url(requested - 1)),
        next_url: (requested < total_pages).then(|| admin_page_url(requested + 1)),
    }
    .into_response())
}

/// Fields and images read from the multipart create form.
#[derive(Debug, Default)]
struct CreateForm {
    fields: HashMap<String, String>,
    images: Vec<ImageUpload>,
}

impl CreateForm {
    fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }

    fn draft(&self) -> std::result::Result<ProductDraft, ValidationError> {
        if self.images.is_empty() {
            return Err(ValidationError::NoImages);
        }
        ProductDraft::parse(
            self.field("title"),
            self.field("description"),
            self.field("category"),
            self.field("price"),
            self.field("stock"),
        )
    }
}

async fn read_create_form(multipart: &mut Multipart) -> Result<CreateForm> {
    let mut form = CreateForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "files" {
            let file_name = field.file_name().unwrap_or("image").to_owned();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            // An untouched file input still submits one empty part
            if bytes.is_empty() {
                continue;
            }
            if !content_type.starts_with("image/") {
                return Err(AppError::BadRequest(format!(
                    "{file_name} is not an image"
                )));
            }
            form.images.push(ImageUpload {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Create a product with its images.
#[instrument(skip_all, fields(user_id = %auth.user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(auth): RequireAdmin,
    mut multipart: Multipart,
) -> Result<Response> {
    let form = match read_create_form(&mut multipart).await {
        Ok(form) => form,
        Err(AppError::BadRequest(message)) => {
            return Ok(flash::redirect(&session, Flash::error(message), "/admin").await?);
        }
        Err(e) => return Err(e),
    };

    let draft = match form.draft() {
        Ok(draft) => draft,
        Err(e) => {
            return Ok(flash::redirect(&session, Flash::error(e.to_string()), "/admin").await?);
        }
    };

    let image_count = form.images.len();
    let notice = match state
        .api()
        .create_product(&auth.token, &draft, form.images)
        .await
    {
        Ok(response) => {
            tracing::info!(title = %draft.title, images = image_count, "Product created");
            add_breadcrumb("admin", "Created product", Some(&[("title", draft.title.as_str())]));
            Flash::success(response.or("Product added successfully"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Product creation rejected");
            Flash::error(e.user_message("Failed to add product"))
        }
    };
    Ok(flash::redirect(&session, notice, "/admin").await?)
}

/// Display the edit form prefilled from the catalogue.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Response> {
    let detail = match state.api().product(&ProductId::new(id)).await {
        Ok(detail) => detail,
        Err(e) if e.is_client_error() => {
            return Ok(flash::redirect(&session, Flash::error("Product not found"), "/admin").await?);
        }
        Err(e) => return Err(e.into()),
    };
    let product = detail.product;

    let page = PageContext::for_user(&state, &session, &nonce, Some(&auth)).await?;
    Ok(AdminProductEditTemplate {
        page,
        active: "products",
        id: product.id.to_string(),
        image: product.thumbnail().map(String::from),
        form: ProductFormView::from(ProductDraft::from_product(&product)),
    }
    .into_response())
}

/// Save edited product fields.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(auth): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let back = edit_url(&id);
    let draft = match ProductDraft::parse(
        &form.title,
        &form.description,
        &form.category,
        &form.price,
        &form.stock,
    ) {
        Ok(draft) => draft,
        Err(e) => return Ok(flash::redirect(&session, Flash::error(e.to_string()), &back).await?),
    };

    match state
        .api()
        .update_product(&auth.token, &ProductId::new(id), &draft)
        .await
    {
        Ok(response) => {
            let notice = Flash::success(response.or("Product updated"));
            Ok(flash::redirect(&session, notice, "/admin").await?)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Product update rejected");
            let notice = Flash::error(e.user_message("Failed to update product"));
            Ok(flash::redirect(&session, notice, &back).await?)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(images: usize) -> CreateForm {
        let mut form = CreateForm::default();
        for (k, v) in [
            ("title", "Desk Lamp"),
            ("description", "Warm light"),
            ("category", "home"),
            ("price", "1299"),
            ("stock", "4"),
        ] {
            form.fields.insert(k.to_string(), v.to_string());
        }
        for i in 0..images {
            form.images.push(ImageUpload {
                file_name: format!("{i}.jpg"),
                content_type: "image/jpeg".to_string(),
                bytes: vec![0xFF, 0xD8],
            });
        }
        form
    }

    #[test]
    fn test_create_requires_an_image() {
        assert_eq!(form(0).draft().unwrap_err(), ValidationError::NoImages);
        assert_eq!(form(2).draft().unwrap().stock, 4);
    }

    #[test]
    fn test_missing_field_is_reported() {
        let mut form = form(1);
        form.fields.remove("title");
        assert_eq!(form.draft().unwrap_err(), ValidationError::Required("title"));
    }

    #[test]
    fn test_admin_page_urls() {
        assert_eq!(admin_page_url(1), "/admin");
        assert_eq!(admin_page_url(3), "/admin?page=3");
        assert_eq!(edit_url("p 1"), "/admin/products/p%201/edit");
    }
}
