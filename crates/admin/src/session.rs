//! Edit session: the local draft of the content document and the version
//! token it is based on.
//!
//! ```text
//! Empty --hydrate--> Hydrated --edit--> Dirty --save--> Saving
//!                       ^                 ^               |
//!                       |                 |  other error  |
//!                       +------ ok -------+---------------+
//!                                         |               | conflict
//!                        adopt_remote_version             v
//!                                         +------ ConflictPending
//! ```
//!
//! `hydrate` is accepted from every state except `Saving` and always replaces
//! the draft. A conflict is never resolved silently: the operator either
//! re-hydrates (dropping local edits) or adopts the remote version token and
//! saves again (overwriting the newer remote revision).
//!
//! Remote calls are split into a `begin_*` step and a `complete_*` or
//! `finish_*` step so a shared owner can drop its lock while a request is in
//! flight. The `async` helpers run both halves for exclusive owners.

use core::fmt;
use std::str::FromStr;

use artistic_gurl_core::{
    ColorToken, ContentDocument, IconToken, Product, ProductId, VersionToken, Violation,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{AssetReference, ContentStore, Snapshot, StoreError};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing loaded yet.
    #[default]
    Empty,
    /// Draft equals the remote revision at `token`.
    Hydrated,
    /// Draft has local edits not yet saved.
    Dirty,
    /// A save is in flight.
    Saving,
    /// The last save lost against a newer remote revision.
    ConflictPending,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Hydrated => "hydrated",
            Self::Dirty => "dirty",
            Self::Saving => "saving",
            Self::ConflictPending => "conflict_pending",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation is not allowed in the current state.
    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

/// A scalar text field of the document that can be edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum SiteField {
    SiteTitle,
    Announcement,
    HeroTitle,
    HeroSubtitle,
    SitePhone,
    SiteEmail,
    SiteInstagram,
    ContactEmail,
    ContactPhone,
    ContactInstagram,
}

impl SiteField {
    pub const ALL: [Self; 10] = [
        Self::SiteTitle,
        Self::Announcement,
        Self::HeroTitle,
        Self::HeroSubtitle,
        Self::SitePhone,
        Self::SiteEmail,
        Self::SiteInstagram,
        Self::ContactEmail,
        Self::ContactPhone,
        Self::ContactInstagram,
    ];

    /// Dotted JSON path of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SiteTitle => "siteConfig.title",
            Self::Announcement => "siteConfig.announcement",
            Self::HeroTitle => "siteConfig.heroTitle",
            Self::HeroSubtitle => "siteConfig.heroSubtitle",
            Self::SitePhone => "siteConfig.phone",
            Self::SiteEmail => "siteConfig.email",
            Self::SiteInstagram => "siteConfig.instagram",
            Self::ContactEmail => "contact.email",
            Self::ContactPhone => "contact.phone",
            Self::ContactInstagram => "contact.instagram",
        }
    }

    fn slot(self, document: &mut ContentDocument) -> &mut String {
        let site = &mut document.site_config;
        let contact = &mut document.contact;
        match self {
            Self::SiteTitle => &mut site.title,
            Self::Announcement => &mut site.announcement,
            Self::HeroTitle => &mut site.hero_title,
            Self::HeroSubtitle => &mut site.hero_subtitle,
            Self::SitePhone => &mut site.phone,
            Self::SiteEmail => &mut site.email,
            Self::SiteInstagram => &mut site.instagram,
            Self::ContactEmail => &mut contact.email,
            Self::ContactPhone => &mut contact.phone,
            Self::ContactInstagram => &mut contact.instagram,
        }
    }
}

impl fmt::Display for SiteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}

impl TryFrom<String> for SiteField {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SiteField> for &'static str {
    fn from(field: SiteField) -> Self {
        field.as_str()
    }
}

/// Partial update of a product; absent fields are left alone.
///
/// `image` has three cases: absent keeps the image, `null` clears it so the
/// card falls back to its icon, a string replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductPatch {
    pub title: Option<String>,
    pub price: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "desc")]
    pub description: Option<String>,
    pub color: Option<ColorToken>,
    pub icon: Option<IconToken>,
    #[serde(with = "::serde_with::rust::double_option")]
    pub image: Option<Option<String>>,
}

impl ProductPatch {
    /// Apply to `product`; returns whether anything changed.
    pub fn apply(&self, product: &mut Product) -> bool {
        fn set<T: PartialEq + Clone>(slot: &mut T, value: Option<&T>) -> bool {
            match value {
                Some(value) if slot != value => {
                    *slot = value.clone();
                    true
                }
                _ => false,
            }
        }

        let mut changed = false;
        changed |= set(&mut product.title, self.title.as_ref());
        changed |= set(&mut product.price, self.price.as_ref());
        changed |= set(&mut product.category, self.category.as_ref());
        changed |= set(&mut product.description, self.description.as_ref());
        changed |= set(&mut product.color, self.color.as_ref());
        changed |= set(&mut product.icon, self.icon.as_ref());
        changed |= set(&mut product.image, self.image.as_ref());
        changed
    }
}

/// What `begin_save` hands to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRequest {
    /// No local edits; nothing to send.
    UpToDate(VersionToken),
    /// Send `document` conditioned on `expected`, then call `complete_save`.
    Pending {
        document: ContentDocument,
        expected: VersionToken,
    },
}

/// The single in-memory draft of the content document.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: SessionState,
    draft: Option<(ContentDocument, VersionToken)>,
    /// Images uploaded while the draft was frozen, applied once it is
    /// editable again.
    pending_images: Vec<(ProductId, String)>,
}

impl EditSession {
    /// A session with nothing loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// The current draft, if hydrated.
    #[must_use]
    pub fn document(&self) -> Option<&ContentDocument> {
        self.draft.as_ref().map(|(document, _)| document)
    }

    /// The version token the draft is based on, if hydrated.
    #[must_use]
    pub fn token(&self) -> Option<&VersionToken> {
        self.draft.as_ref().map(|(_, token)| token)
    }

    /// Whether mutators are accepted.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        matches!(self.state, SessionState::Hydrated | SessionState::Dirty)
    }

    /// Validation findings for the current draft.
    #[must_use]
    pub fn findings(&self) -> Vec<Violation> {
        self.document().map(ContentDocument::validate).unwrap_or_default()
    }

    const fn reject<T>(&self, operation: &'static str) -> Result<T, SessionError> {
        Err(SessionError::InvalidState {
            operation,
            state: self.state,
        })
    }

    fn editable_document(&mut self, operation: &'static str) -> Result<&mut ContentDocument, SessionError> {
        let state = self.state;
        let editable = self.is_editable();
        match self.draft.as_mut() {
            Some((document, _)) if editable => Ok(document),
            _ => Err(SessionError::InvalidState { operation, state }),
        }
    }

    fn mark_dirty(&mut self, changed: bool) {
        if changed {
            self.state = SessionState::Dirty;
        }
    }

    /// Images waiting for an in-flight save or a conflict to settle.
    #[must_use]
    pub fn pending_images(&self) -> usize {
        self.pending_images.len()
    }

    fn apply_pending_images(&mut self) {
        if !self.is_editable() {
            return;
        }
        for (id, image) in std::mem::take(&mut self.pending_images) {
            let patch = ProductPatch {
                image: Some(Some(image)),
                ..ProductPatch::default()
            };
            match self.update_product(id, &patch) {
                Ok(true) => info!(product_id = %id, "Deferred image attached"),
                Ok(false) => warn!(product_id = %id, "Product gone; deferred image dropped"),
                Err(err) => warn!(product_id = %id, error = %err, "Deferred image dropped"),
            }
        }
    }

    fn drop_pending_images(&mut self) {
        if !self.pending_images.is_empty() {
            warn!(count = self.pending_images.len(), "Dropping deferred images with the draft");
            self.pending_images.clear();
        }
    }

    // ---------------------------------------------------------------------
    // Hydrate
    // ---------------------------------------------------------------------

    /// Check that a hydrate may start.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] while a save is in flight.
    pub const fn begin_hydrate(&self) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::Saving) {
            return self.reject("hydrate");
        }
        Ok(())
    }

    /// Replace the draft with a freshly fetched snapshot.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] if a save started in the meantime.
    pub fn finish_hydrate(&mut self, snapshot: Snapshot) -> Result<&VersionToken, SessionError> {
        self.begin_hydrate()?;
        if self.state == SessionState::Dirty || self.state == SessionState::ConflictPending {
            warn!(state = %self.state, "Discarding local edits");
        }
        info!(
            token = %snapshot.token.short(),
            products = snapshot.document.products.len(),
            "Session hydrated"
        );
        self.drop_pending_images();
        self.state = SessionState::Hydrated;
        let (_, token) = self.draft.insert((snapshot.document, snapshot.token));
        Ok(token)
    }

    /// Fetch the remote document and make it the draft.
    ///
    /// On failure the session is left exactly as it was.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] while saving, otherwise the store error.
    pub async fn hydrate<S: ContentStore>(
        &mut self,
        store: &S,
        credential: &SecretString,
    ) -> Result<&VersionToken, SessionError> {
        self.begin_hydrate()?;
        let snapshot = store.fetch_document(credential).await?;
        self.finish_hydrate(snapshot)
    }

    /// Drop the draft without saving.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] while a save is in flight.
    pub fn discard(&mut self) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::Saving) {
            return self.reject("discard");
        }
        self.drop_pending_images();
        self.state = SessionState::Empty;
        self.draft = None;
        info!("Session discarded");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Mutators
    // ---------------------------------------------------------------------

    /// Set a scalar text field; returns whether it changed.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless hydrated or dirty.
    pub fn set_field(&mut self, field: SiteField, value: &str) -> Result<bool, SessionError> {
        let slot = field.slot(self.editable_document("set a field")?);
        let changed = slot != value;
        if changed {
            value.clone_into(slot);
        }
        self.mark_dirty(changed);
        Ok(changed)
    }

    /// Apply `patch` to product `id`; returns whether a product matched.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless hydrated or dirty.
    pub fn update_product(
        &mut self,
        id: ProductId,
        patch: &ProductPatch,
    ) -> Result<bool, SessionError> {
        let document = self.editable_document("update a product")?;
        let Some(product) = document.product_mut(id) else {
            return Ok(false);
        };
        let changed = patch.apply(product);
        if changed {
            let findings = document
                .product(id)
                .map(|p| document.validate_product(p))
                .unwrap_or_default();
            for finding in findings.iter().filter(|f| f.is_warning()) {
                warn!(%finding, "Product saved with a warning");
            }
        }
        self.mark_dirty(changed);
        Ok(true)
    }

    /// Append a placeholder product with the next free ID.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless hydrated or dirty.
    pub fn add_product(&mut self) -> Result<&Product, SessionError> {
        let document = self.editable_document("add a product")?;
        let id = document.next_product_id();
        document.products.push(Product::placeholder(id));
        self.state = SessionState::Dirty;
        info!(product_id = %id, "Product added");
        self.document()
            .and_then(|document| document.products.last())
            .ok_or(SessionError::InvalidState {
                operation: "add a product",
                state: SessionState::Empty,
            })
    }

    /// Remove the first product with `id`; returns whether one existed.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless hydrated or dirty.
    pub fn remove_product(&mut self, id: ProductId) -> Result<bool, SessionError> {
        let document = self.editable_document("remove a product")?;
        let removed = match document.products.iter().position(|p| p.id == id) {
            Some(index) => {
                document.products.remove(index);
                info!(product_id = %id, "Product removed");
                true
            }
            None => false,
        };
        self.mark_dirty(removed);
        Ok(removed)
    }

    /// Point product `id`'s image at an uploaded asset; returns whether the
    /// product exists.
    ///
    /// While a save is in flight or a conflict is pending the draft is
    /// frozen, so the reference is queued and applied as soon as the session
    /// is editable again. A re-hydrate or discard drops the queue along with
    /// the rest of the local edits.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] when nothing is loaded.
    pub fn attach_image(
        &mut self,
        id: ProductId,
        reference: &AssetReference,
    ) -> Result<bool, SessionError> {
        if matches!(
            self.state,
            SessionState::Saving | SessionState::ConflictPending
        ) {
            let exists = self.document().is_some_and(|d| d.product(id).is_some());
            if exists {
                info!(product_id = %id, state = %self.state, "Image queued until the draft is editable");
                self.pending_images.push((id, reference.as_str().to_string()));
            }
            return Ok(exists);
        }
        let patch = ProductPatch {
            image: Some(Some(reference.as_str().to_string())),
            ..ProductPatch::default()
        };
        self.update_product(id, &patch)
    }

    // ---------------------------------------------------------------------
    // Save
    // ---------------------------------------------------------------------

    /// Start a save.
    ///
    /// From `Dirty` the session moves to `Saving` and the caller must send
    /// the returned document and then call [`EditSession::complete_save`].
    /// From `Hydrated` there is nothing to send and the state is unchanged.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] from any other state.
    pub fn begin_save(&mut self) -> Result<SaveRequest, SessionError> {
        match (self.state, &self.draft) {
            (SessionState::Hydrated, Some((_, token))) => Ok(SaveRequest::UpToDate(token.clone())),
            (SessionState::Dirty, Some((document, token))) => {
                let request = SaveRequest::Pending {
                    document: document.clone(),
                    expected: token.clone(),
                };
                self.state = SessionState::Saving;
                Ok(request)
            }
            _ => self.reject("save"),
        }
    }

    /// Record the outcome of the save started by [`EditSession::begin_save`].
    ///
    /// The outcome itself never modifies the draft: on success only the token
    /// changes, on failure nothing does. Images queued during the save are
    /// then applied unless the save hit a conflict, which leaves the draft
    /// frozen and the queue in place.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] if no save is in flight, otherwise the
    /// store error from `outcome`.
    pub fn complete_save(
        &mut self,
        outcome: Result<VersionToken, StoreError>,
    ) -> Result<VersionToken, SessionError> {
        if self.state != SessionState::Saving {
            return self.reject("complete a save");
        }
        match outcome {
            Ok(new_token) => {
                if let Some((_, token)) = self.draft.as_mut() {
                    info!(from = %token.short(), to = %new_token.short(), "Session saved");
                    *token = new_token.clone();
                }
                self.state = SessionState::Hydrated;
                self.apply_pending_images();
                Ok(new_token)
            }
            Err(err @ StoreError::Conflict(_)) => {
                warn!(error = %err, "Save rejected: remote document changed");
                self.state = SessionState::ConflictPending;
                Err(err.into())
            }
            Err(err) => {
                warn!(error = %err, "Save failed; edits kept");
                self.state = SessionState::Dirty;
                self.apply_pending_images();
                Err(err.into())
            }
        }
    }

    /// Save the draft, conditioned on the token it was hydrated with.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless hydrated or dirty, otherwise the
    /// store error. [`StoreError::Conflict`] leaves the session in
    /// `ConflictPending` with the draft untouched.
    pub async fn save<S: ContentStore>(
        &mut self,
        store: &S,
        credential: &SecretString,
    ) -> Result<VersionToken, SessionError> {
        match self.begin_save()? {
            SaveRequest::UpToDate(token) => Ok(token),
            SaveRequest::Pending { document, expected } => {
                let outcome = store.save_document(credential, &document, &expected).await;
                self.complete_save(outcome)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Conflict resolution
    // ---------------------------------------------------------------------

    /// Check that the remote version may be adopted.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless in `ConflictPending`.
    pub const fn begin_adopt(&self) -> Result<(), SessionError> {
        if matches!(self.state, SessionState::ConflictPending) {
            Ok(())
        } else {
            self.reject("adopt the remote version")
        }
    }

    /// Keep the local draft but rebase it onto `remote`'s token; the next
    /// save overwrites the remote revision.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless still in `ConflictPending`.
    pub fn finish_adopt(&mut self, remote: VersionToken) -> Result<&VersionToken, SessionError> {
        self.begin_adopt()?;
        let state = self.state;
        let Some((_, token)) = self.draft.as_mut() else {
            return Err(SessionError::InvalidState {
                operation: "adopt the remote version",
                state,
            });
        };
        warn!(from = %token.short(), to = %remote.short(), "Adopting remote version over local base");
        *token = remote;
        self.state = SessionState::Dirty;
        self.apply_pending_images();
        self.token().ok_or(SessionError::InvalidState {
            operation: "adopt the remote version",
            state,
        })
    }

    /// Fetch the current remote token and adopt it, keeping the local draft.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless in `ConflictPending`, otherwise
    /// the store error (the session then stays in `ConflictPending`).
    pub async fn adopt_remote_version<S: ContentStore>(
        &mut self,
        store: &S,
        credential: &SecretString,
    ) -> Result<&VersionToken, SessionError> {
        self.begin_adopt()?;
        let snapshot = store.fetch_document(credential).await?;
        self.finish_adopt(snapshot.token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashSet;

    use serde_json::json;

    use super::*;
    use crate::store::InMemoryContentStore;

    fn id(n: u32) -> ProductId {
        ProductId::new(n).unwrap()
    }

    fn credential() -> SecretString {
        SecretString::from("ghp_test")
    }

    fn store_with(products: serde_json::Value) -> InMemoryContentStore {
        let document = ContentDocument::parse(json!({
            "siteConfig": { "title": "Artistic Gurl" },
            "categories": ["Love"],
            "products": products,
            "contact": {},
            "reviews": []
        }))
        .unwrap();
        InMemoryContentStore::seeded(&document).unwrap()
    }

    fn store() -> InMemoryContentStore {
        store_with(json!([{ "id": 1, "title": "Heart", "price": "PKR 500", "category": "Love" }]))
    }

    async fn hydrated(store: &InMemoryContentStore) -> EditSession {
        let mut session = EditSession::new();
        session.hydrate(store, &credential()).await.unwrap();
        session
    }

    #[test]
    fn test_empty_session_rejects_everything_but_hydrate() {
        let mut session = EditSession::new();
        assert!(matches!(
            session.set_field(SiteField::SiteTitle, "x"),
            Err(SessionError::InvalidState { state: SessionState::Empty, .. })
        ));
        assert!(session.add_product().is_err());
        assert!(session.remove_product(id(1)).is_err());
        assert!(session.update_product(id(1), &ProductPatch::default()).is_err());
        assert!(session.begin_save().is_err());
        assert!(session.begin_adopt().is_err());
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.document().is_none());
    }

    #[tokio::test]
    async fn test_hydrate_then_edit_marks_dirty() {
        let store = store();
        let mut session = hydrated(&store).await;
        assert_eq!(session.state(), SessionState::Hydrated);
        assert_eq!(session.token(), store.current_token().as_ref());

        // setting the same value is not an edit
        assert!(!session.set_field(SiteField::SiteTitle, "Artistic Gurl").unwrap());
        assert_eq!(session.state(), SessionState::Hydrated);

        assert!(session.set_field(SiteField::ContactEmail, "hi@example.com").unwrap());
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.document().unwrap().contact.email, "hi@example.com");
    }

    #[tokio::test]
    async fn test_failed_hydrate_keeps_previous_state() {
        let store = store();
        let mut session = EditSession::new();
        store.fail_next(StoreError::Transport("offline".to_string()));
        assert!(session.hydrate(&store, &credential()).await.is_err());
        assert_eq!(session.state(), SessionState::Empty);

        session.hydrate(&store, &credential()).await.unwrap();
        session.set_field(SiteField::HeroTitle, "Cards").unwrap();
        store.fail_next(StoreError::NotFound("public/db.json".to_string()));
        assert!(session.hydrate(&store, &credential()).await.is_err());
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.document().unwrap().site_config.hero_title, "Cards");
    }

    #[tokio::test]
    async fn test_add_then_remove_keeps_ids_unique() {
        let store = store_with(json!([]));
        let mut session = hydrated(&store).await;

        for _ in 0..4 {
            session.add_product().unwrap();
        }
        session.remove_product(id(2)).unwrap();
        session.remove_product(id(4)).unwrap();
        assert_eq!(session.add_product().unwrap().id, id(4));
        session.add_product().unwrap();

        let ids: Vec<u32> = session
            .document()
            .unwrap()
            .products
            .iter()
            .map(|p| p.id.get())
            .collect();
        assert_eq!(ids, vec![1, 3, 4, 5]);
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), ids.len());
    }

    #[tokio::test]
    async fn test_add_product_uses_placeholder_values() {
        let store = store();
        let mut session = hydrated(&store).await;
        let product = session.add_product().unwrap().clone();
        assert_eq!(product.id, id(2));
        assert_eq!(product.title, "New Product");
        assert_eq!(product.price, "PKR 0");
        assert_eq!(product.category, "General");
        assert_eq!(product.icon, IconToken::Gift);
        assert_eq!(session.state(), SessionState::Dirty);
    }

    #[tokio::test]
    async fn test_missing_product_is_a_no_op() {
        let store = store();
        let mut session = hydrated(&store).await;
        let patch = ProductPatch {
            title: Some("Ghost".to_string()),
            ..ProductPatch::default()
        };
        assert!(!session.update_product(id(9), &patch).unwrap());
        assert!(!session.remove_product(id(9)).unwrap());
        assert_eq!(session.state(), SessionState::Hydrated);
    }

    #[tokio::test]
    async fn test_patch_applies_only_given_fields() {
        let store = store();
        let mut session = hydrated(&store).await;
        let patch: ProductPatch =
            serde_json::from_value(json!({ "price": "PKR 900", "desc": "Folded", "color": "bg-pink-50" }))
                .unwrap();
        assert!(session.update_product(id(1), &patch).unwrap());

        let product = session.document().unwrap().product(id(1)).unwrap();
        assert_eq!(product.title, "Heart");
        assert_eq!(product.price, "PKR 900");
        assert_eq!(product.description, "Folded");
        assert_eq!(product.color, ColorToken::Pink);
        assert_eq!(session.state(), SessionState::Dirty);
    }

    #[tokio::test]
    async fn test_save_from_hydrated_makes_no_remote_call() {
        let store = store();
        let mut session = hydrated(&store).await;
        let before = session.token().cloned().unwrap();
        // a remote call would consume this failure
        store.fail_next(StoreError::Transport("should not be called".to_string()));
        assert_eq!(session.save(&store, &credential()).await.unwrap(), before);
        assert_eq!(session.state(), SessionState::Hydrated);
    }

    #[tokio::test]
    async fn test_save_success_updates_token() {
        let store = store();
        let mut session = hydrated(&store).await;
        let before = session.token().cloned().unwrap();
        session.set_field(SiteField::Announcement, "Eid sale").unwrap();

        let after = session.save(&store, &credential()).await.unwrap();
        assert_ne!(after, before);
        assert_eq!(session.token(), Some(&after));
        assert_eq!(session.state(), SessionState::Hydrated);
        assert_eq!(store.current_token(), Some(after));
    }

    #[tokio::test]
    async fn test_conflict_keeps_draft_byte_identical() {
        let store = store();
        let mut a = hydrated(&store).await;
        let mut b = hydrated(&store).await;

        a.set_field(SiteField::SiteTitle, "From A").unwrap();
        let a_token = a.save(&store, &credential()).await.unwrap();

        b.set_field(SiteField::SiteTitle, "From B").unwrap();
        b.add_product().unwrap();
        let draft_before = b.document().unwrap().to_pretty_json().unwrap();
        let token_before = b.token().cloned();

        let err = b.save(&store, &credential()).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::Conflict(_))));
        assert_eq!(b.state(), SessionState::ConflictPending);
        assert_eq!(b.document().unwrap().to_pretty_json().unwrap(), draft_before);
        assert_eq!(b.token().cloned(), token_before);

        // the store still has A's revision
        let remote = store.fetch_document(&credential()).await.unwrap();
        assert_eq!(remote.token, a_token);
        assert_eq!(remote.document.site_config.title, "From A");

        // edits are refused until the conflict is resolved
        assert!(b.set_field(SiteField::SiteTitle, "again").is_err());
        assert!(b.begin_save().is_err());
    }

    #[tokio::test]
    async fn test_adopt_remote_version_overwrites_on_next_save() {
        let store = store();
        let mut a = hydrated(&store).await;
        let mut b = hydrated(&store).await;
        a.set_field(SiteField::SiteTitle, "From A").unwrap();
        a.save(&store, &credential()).await.unwrap();
        b.set_field(SiteField::SiteTitle, "From B").unwrap();
        assert!(b.save(&store, &credential()).await.is_err());

        let adopted = b.adopt_remote_version(&store, &credential()).await.unwrap().clone();
        assert_eq!(Some(adopted), store.current_token());
        assert_eq!(b.state(), SessionState::Dirty);
        assert_eq!(b.document().unwrap().site_config.title, "From B");

        b.save(&store, &credential()).await.unwrap();
        let remote = store.fetch_document(&credential()).await.unwrap();
        assert_eq!(remote.document.site_config.title, "From B");
    }

    #[tokio::test]
    async fn test_rehydrate_resolves_conflict_by_dropping_edits() {
        let store = store();
        let mut a = hydrated(&store).await;
        let mut b = hydrated(&store).await;
        a.set_field(SiteField::SiteTitle, "From A").unwrap();
        a.save(&store, &credential()).await.unwrap();
        b.set_field(SiteField::SiteTitle, "From B").unwrap();
        assert!(b.save(&store, &credential()).await.is_err());

        b.hydrate(&store, &credential()).await.unwrap();
        assert_eq!(b.state(), SessionState::Hydrated);
        assert_eq!(b.document().unwrap().site_config.title, "From A");
    }

    #[tokio::test]
    async fn test_transport_failure_returns_to_dirty() {
        let store = store();
        let mut session = hydrated(&store).await;
        session.set_field(SiteField::SitePhone, "+92 300").unwrap();
        let token = session.token().cloned();

        store.fail_next(StoreError::Transport("timed out".to_string()));
        let err = session.save(&store, &credential()).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::Transport(_))));
        assert_eq!(session.state(), SessionState::Dirty);
        assert_eq!(session.token().cloned(), token);
        assert_eq!(session.document().unwrap().site_config.phone, "+92 300");
    }

    #[tokio::test]
    async fn test_saving_blocks_mutation_and_second_save() {
        let store = store();
        let mut session = hydrated(&store).await;
        session.add_product().unwrap();

        let request = session.begin_save().unwrap();
        assert!(matches!(request, SaveRequest::Pending { .. }));
        assert_eq!(session.state(), SessionState::Saving);
        assert!(session.begin_save().is_err());
        assert!(session.add_product().is_err());
        assert!(session.begin_hydrate().is_err());
        assert!(session.discard().is_err());

        session
            .complete_save(Ok(VersionToken::new("next")))
            .unwrap();
        assert_eq!(session.state(), SessionState::Hydrated);
        assert!(session.complete_save(Ok(VersionToken::new("again"))).is_err());
    }

    #[tokio::test]
    async fn test_scenario_add_remove_save() {
        let document = ContentDocument::parse(json!({
            "siteConfig": {}, "contact": {}, "reviews": [],
            "categories": ["Love"],
            "products": [{ "id": 1 }]
        }))
        .unwrap();
        let mut session = EditSession::new();
        session
            .finish_hydrate(Snapshot {
                document: document.clone(),
                token: VersionToken::new("abc"),
            })
            .unwrap();

        assert_eq!(session.add_product().unwrap().id, id(2));
        assert!(session.remove_product(id(1)).unwrap());
        let ids: Vec<u32> = session.document().unwrap().products.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![2]);

        let SaveRequest::Pending { expected, .. } = session.begin_save().unwrap() else {
            panic!("expected a pending save");
        };
        assert_eq!(expected.as_str(), "abc");
        let token = session.complete_save(Ok(VersionToken::new("def"))).unwrap();
        assert_ne!(token.as_str(), "abc");
        assert_eq!(session.state(), SessionState::Hydrated);
    }

    #[test]
    fn test_site_field_parsing() {
        for field in SiteField::ALL {
            assert_eq!(field.as_str().parse::<SiteField>().unwrap(), field);
        }
        assert!("siteConfig.ticker".parse::<SiteField>().is_err());
        let field: SiteField = serde_json::from_value(json!("contact.phone")).unwrap();
        assert_eq!(field, SiteField::ContactPhone);
    }

    fn upload(name: &str) -> AssetReference {
        AssetReference::new(format!("/uploads/1700000000000_{name}"))
    }

    #[tokio::test]
    async fn test_image_uploaded_during_save_is_attached_after_it() {
        let store = store();
        let mut session = hydrated(&store).await;
        session.set_field(SiteField::HeroTitle, "Cards").unwrap();
        assert!(matches!(session.begin_save().unwrap(), SaveRequest::Pending { .. }));

        assert!(session.attach_image(id(1), &upload("heart.png")).unwrap());
        assert_eq!(session.pending_images(), 1);
        // the frozen draft is untouched while the save is in flight
        assert!(session.document().unwrap().product(id(1)).unwrap().image.is_none());

        session.complete_save(Ok(VersionToken::new("next"))).unwrap();
        assert_eq!(session.pending_images(), 0);
        assert_eq!(session.state(), SessionState::Dirty);
        let image = session.document().unwrap().product(id(1)).unwrap().image.clone();
        assert_eq!(image.as_deref(), Some("/uploads/1700000000000_heart.png"));
    }

    #[tokio::test]
    async fn test_image_uploaded_during_failed_save_is_attached() {
        let store = store();
        let mut session = hydrated(&store).await;
        session.set_field(SiteField::HeroTitle, "Cards").unwrap();
        session.begin_save().unwrap();
        assert!(session.attach_image(id(1), &upload("a.png")).unwrap());

        assert!(session
            .complete_save(Err(StoreError::Transport("reset".to_string())))
            .is_err());
        assert_eq!(session.state(), SessionState::Dirty);
        assert!(session.document().unwrap().product(id(1)).unwrap().image.is_some());
    }

    #[tokio::test]
    async fn test_image_queued_through_conflict_lands_on_adopt() {
        let store = store();
        let mut a = hydrated(&store).await;
        let mut b = hydrated(&store).await;
        a.set_field(SiteField::SiteTitle, "From A").unwrap();
        a.save(&store, &credential()).await.unwrap();

        b.set_field(SiteField::SiteTitle, "From B").unwrap();
        b.begin_save().unwrap();
        assert!(b.attach_image(id(1), &upload("b.png")).unwrap());
        let outcome = store
            .save_document(&credential(), b.document().unwrap(), b.token().unwrap())
            .await;
        assert!(b.complete_save(outcome).is_err());

        // conflict leaves the draft frozen with the image still queued
        assert_eq!(b.state(), SessionState::ConflictPending);
        assert!(b.document().unwrap().product(id(1)).unwrap().image.is_none());
        assert_eq!(b.pending_images(), 1);

        b.adopt_remote_version(&store, &credential()).await.unwrap();
        assert_eq!(b.pending_images(), 0);
        let image = b.document().unwrap().product(id(1)).unwrap().image.clone();
        assert_eq!(image.as_deref(), Some("/uploads/1700000000000_b.png"));
    }

    #[tokio::test]
    async fn test_rehydrate_drops_queued_images() {
        let store = store();
        let mut session = hydrated(&store).await;
        session.set_field(SiteField::HeroTitle, "Cards").unwrap();
        session.begin_save().unwrap();
        session.attach_image(id(1), &upload("x.png")).unwrap();
        session
            .complete_save(Err(StoreError::Conflict("public/db.json".to_string())))
            .unwrap_err();

        session.hydrate(&store, &credential()).await.unwrap();
        assert_eq!(session.pending_images(), 0);
        assert!(session.document().unwrap().product(id(1)).unwrap().image.is_none());
    }

    #[tokio::test]
    async fn test_attach_during_save_to_unknown_product_is_not_queued() {
        let store = store();
        let mut session = hydrated(&store).await;
        session.add_product().unwrap();
        session.begin_save().unwrap();
        assert!(!session.attach_image(id(9), &upload("x.png")).unwrap());
        assert_eq!(session.pending_images(), 0);
    }

    #[test]
    fn test_remove_takes_only_the_first_duplicate() {
        let document = ContentDocument::parse(json!({
            "siteConfig": {}, "contact": {}, "reviews": [], "categories": [],
            "products": [
                { "id": 3, "title": "First" },
                { "id": 3, "title": "Second" },
                { "id": 5, "title": "Other" }
            ]
        }))
        .unwrap();
        let mut session = EditSession::new();
        session
            .finish_hydrate(Snapshot {
                document,
                token: VersionToken::new("abc"),
            })
            .unwrap();

        assert!(session.remove_product(id(3)).unwrap());
        let titles: Vec<&str> = session
            .document()
            .unwrap()
            .products
            .iter()
            .map(|p| p.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Second", "Other"]);
    }

    #[tokio::test]
    async fn test_patch_image_null_clears_and_absent_keeps() {
        let store = store();
        let mut session = hydrated(&store).await;
        let set: ProductPatch = serde_json::from_value(json!({ "image": "/uploads/a.png" })).unwrap();
        assert_eq!(set.image, Some(Some("/uploads/a.png".to_string())));
        assert!(session.update_product(id(1), &set).unwrap());

        let keep: ProductPatch = serde_json::from_value(json!({ "title": "Heart 2" })).unwrap();
        assert_eq!(keep.image, None);
        session.update_product(id(1), &keep).unwrap();
        let product = session.document().unwrap().product(id(1)).unwrap();
        assert_eq!(product.image.as_deref(), Some("/uploads/a.png"));

        let clear: ProductPatch = serde_json::from_value(json!({ "image": null })).unwrap();
        assert_eq!(clear.image, Some(None));
        session.update_product(id(1), &clear).unwrap();
        assert!(session.document().unwrap().product(id(1)).unwrap().image.is_none());
    }

    #[tokio::test]
    async fn test_discard_returns_to_empty() {
        let store = store();
        let mut session = hydrated(&store).await;
        session.add_product().unwrap();
        session.discard().unwrap();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.document().is_none());
    }
}
