pub mod draft;

use crate::auth::password::hash_password;
use crate::configuration::AuthSettings;
use crate::data_models::DashboardCounts;
use crate::db::vehicle_filter::VehicleFilter;
use crate::db::{Database, StaffUser, Vehicle, VehicleKind, VehicleStore};
use crate::errors::AppErrors;
use crate::uploads::{PendingUpload, UploadStore};
use axum::extract::Multipart;
use draft::VehicleDraft;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

pub const IMAGES_FIELD: &str = "imagesupld";
pub const IMAGE_FIELD: &str = "imageupld";
pub const MAX_IMAGES: usize = 10;

pub async fn dashboard_counts(db: &Database) -> Result<DashboardCounts, AppErrors> {
    let gas = VehicleFilter::scope(VehicleKind::Gas, None);
    let electric = VehicleFilter::scope(VehicleKind::Electric, None);
    let (gas, electric, users, applications) = tokio::try_join!(
        db.count_vehicles(&gas),
        db.count_vehicles(&electric),
        db.all_users(),
        db.all_financing(),
    )?;
    Ok(DashboardCounts {
        gas,
        electric,
        staff: users.len() as u64,
        financing_applications: applications.len() as u64,
    })
}

/// Reads a vehicle form: text parts become the draft, `imagesupld` files
/// are buffered until the draft has been accepted.
pub async fn read_vehicle_form(
    mut multipart: Multipart,
) -> Result<(VehicleDraft, Vec<PendingUpload>), AppErrors> {
    let mut draft = VehicleDraft::default();
    let mut images = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        if name == IMAGES_FIELD {
            let bytes = field.bytes().await?;
            if bytes.is_empty() {
                continue;
            }
            if images.len() == MAX_IMAGES {
                return Err(AppErrors::BadRequest(format!(
                    "At most {MAX_IMAGES} images can be uploaded at once"
                )));
            }
            images.push(PendingUpload { file_name, bytes });
        } else if file_name.is_none() {
            draft.insert(&name, field.text().await?);
        }
    }
    Ok((draft, images))
}

/// Validates the draft, then writes its images and the vehicle. Images are
/// only written for an accepted draft and are removed again when storing
/// the vehicle fails. New images replace those of `existing`.
pub async fn store_vehicle(
    db: &Database,
    uploads: &UploadStore,
    kind: VehicleKind,
    draft: VehicleDraft,
    pending: Vec<PendingUpload>,
    existing: Option<&Vehicle>,
) -> Result<Vehicle, AppErrors> {
    let mut vehicle = draft.into_vehicle(kind, existing)?;
    let saved = uploads.save_all(IMAGES_FIELD, &pending).await?;
    if !saved.is_empty() {
        vehicle.images = saved.clone();
    }
    let stored = match existing {
        Some(_) => db
            .replace_vehicle(vehicle)
            .await
            .map_err(AppErrors::from)
            .and_then(|stored| stored.ok_or(AppErrors::NotFound)),
        None => db.insert_vehicle(vehicle).await.map_err(AppErrors::from),
    };
    if stored.is_err() && !saved.is_empty() {
        warn!("vehicle not stored, removing {} new images", saved.len());
        uploads.remove_all(&saved).await;
    }
    stored
}

/// Stores the single `imageupld` file of a gallery upload.
pub async fn upload_image(
    mut multipart: Multipart,
    uploads: &UploadStore,
) -> Result<String, AppErrors> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            break;
        }
        return Ok(uploads.save(IMAGE_FIELD, file_name.as_deref(), &bytes).await?);
    }
    Err(AppErrors::BadRequest(
        "No file was uploaded or the upload failed.".to_string(),
    ))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct NewStaffUser {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub is_admin: Option<String>,
}

impl NewStaffUser {
    fn admin_flag(&self) -> bool {
        matches!(
            self.is_admin.as_deref().map(str::trim),
            Some("on" | "true" | "1")
        )
    }
}

pub async fn create_staff(
    db: &Database,
    settings: &AuthSettings,
    form: NewStaffUser,
) -> Result<StaffUser, AppErrors> {
    let form = NewStaffUser {
        email: form.email.trim().to_string(),
        ..form
    };
    form.validate()?;
    let hash = hash_password(form.password.clone(), settings.bcrypt_cost).await?;
    let user = db
        .insert_user(StaffUser::new(&form.name, &form.email, hash, form.admin_flag()))
        .await?;
    info!("created staff account {}", user.email);
    Ok(user)
}

pub async fn delete_staff(db: &Database, current: &StaffUser, id: Uuid) -> Result<(), AppErrors> {
    if current.id == id {
        return Err(AppErrors::Conflict(
            "You cannot delete your own account".to_string(),
        ));
    }
    if !db.delete_user(id).await? {
        return Err(AppErrors::NotFound);
    }
    info!("{} deleted staff account {id}", current.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::in_memory::InMemoryDB;
    use crate::configuration::UploadSettings;
    use crate::db::vehicle::fixtures;
    use axum::body::Bytes;

    fn settings() -> AuthSettings {
        AuthSettings {
            session_secret: "secret".to_string(),
            bcrypt_cost: 4,
            ..Default::default()
        }
    }

    fn new_user(email: &str) -> NewStaffUser {
        NewStaffUser {
            name: "Carla".to_string(),
            email: email.to_string(),
            password: "correct-horse".to_string(),
            is_admin: Some("on".to_string()),
        }
    }

    #[tokio::test]
    async fn dashboard_counts_every_status() {
        let db = Database::InMemory(Box::new(InMemoryDB::default()));
        let mut sold = fixtures::gas("Ford", "Focus", 2019, 12000.0);
        sold.status = crate::db::VehicleStatus::Sold;
        db.insert_vehicle(sold).await.unwrap();
        db.insert_vehicle(fixtures::gas("Kia", "Rio", 2020, 11000.0))
            .await
            .unwrap();
        db.insert_vehicle(fixtures::electric("Tesla", "Model 3", 2022, 40000.0, 358.0))
            .await
            .unwrap();
        create_staff(&db, &settings(), new_user("carla@dealer.test"))
            .await
            .unwrap();

        let counts = dashboard_counts(&db).await.unwrap();
        assert_eq!(
            counts,
            DashboardCounts {
                gas: 2,
                electric: 1,
                staff: 1,
                financing_applications: 0,
            }
        );
    }

    #[tokio::test]
    async fn staff_emails_are_unique() {
        let db = Database::InMemory(Box::default());
        let user = create_staff(&db, &settings(), new_user(" Carla@Dealer.test "))
            .await
            .unwrap();
        assert!(user.is_admin);
        assert_eq!(user.email, "carla@dealer.test");
        assert_ne!(user.password_hash, "correct-horse");

        let again = create_staff(&db, &settings(), new_user("carla@dealer.test")).await;
        assert!(matches!(
            again,
            Err(AppErrors::DatabaseError(crate::db::DatabaseError::DuplicateEmail))
        ));
    }

    #[tokio::test]
    async fn short_passwords_are_rejected() {
        let db = Database::InMemory(Box::default());
        let form = NewStaffUser {
            password: "short".to_string(),
            ..new_user("carla@dealer.test")
        };
        let result = create_staff(&db, &settings(), form).await;
        assert!(matches!(result, Err(AppErrors::Validation(_))));
    }

    #[tokio::test]
    async fn admins_cannot_delete_themselves() {
        let db = Database::InMemory(Box::default());
        let admin = create_staff(&db, &settings(), new_user("carla@dealer.test"))
            .await
            .unwrap();
        let other = create_staff(&db, &settings(), new_user("rui@dealer.test"))
            .await
            .unwrap();

        let result = delete_staff(&db, &admin, admin.id).await;
        assert!(matches!(result, Err(AppErrors::Conflict(_))));

        delete_staff(&db, &admin, other.id).await.unwrap();
        let result = delete_staff(&db, &admin, other.id).await;
        assert!(matches!(result, Err(AppErrors::NotFound)));
        assert_eq!(db.all_users().await.unwrap().len(), 1);
    }

    fn upload_store(dir: &tempfile::TempDir) -> UploadStore {
        UploadStore::new(&UploadSettings {
            directory: dir.path().to_string_lossy().to_string(),
            public_prefix: "/images".to_string(),
            max_body_bytes: 1024,
        })
    }

    fn gas_draft(brand: &str) -> VehicleDraft {
        let pairs = [
            ("title", "2020 Kia Rio"),
            ("brand", brand),
            ("model", "Rio"),
            ("year", "2020"),
            ("price", "11000"),
            ("priceStr", "$11,000"),
            ("topSpeed", "180"),
            ("time60", "9,8"),
            ("mileage", "30000"),
            ("engine", "1,6"),
            ("cylinders", "4"),
        ];
        VehicleDraft::new(
            pairs
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        )
    }

    fn photo() -> Vec<PendingUpload> {
        vec![PendingUpload {
            file_name: Some("front.jpg".to_string()),
            bytes: Bytes::from_static(b"jpeg"),
        }]
    }

    fn stored_files(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).map_or(0, |entries| entries.count())
    }

    #[tokio::test]
    async fn accepted_draft_stores_its_images() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let uploads = upload_store(&dir);
        let db = Database::InMemory(Box::default());
        let vehicle = store_vehicle(&db, &uploads, VehicleKind::Gas, gas_draft("Kia"), photo(), None)
            .await
            .expect("Failed to store vehicle");
        assert_eq!(vehicle.images.len(), 1);
        assert!(vehicle.images[0].starts_with("/images/imagesupld-"));
        assert_eq!(stored_files(&dir), 1);
    }

    #[tokio::test]
    async fn rejected_draft_writes_no_images() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let uploads = upload_store(&dir);
        let db = Database::InMemory(Box::default());
        let result = store_vehicle(&db, &uploads, VehicleKind::Gas, gas_draft(""), photo(), None).await;
        assert!(matches!(result, Err(AppErrors::Validation(_))));
        assert_eq!(stored_files(&dir), 0);
    }

    #[tokio::test]
    async fn images_are_removed_when_the_vehicle_is_gone() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let uploads = upload_store(&dir);
        let db = Database::InMemory(Box::default());
        let missing = fixtures::gas("Kia", "Rio", 2020, 11000.0);
        let result = store_vehicle(
            &db,
            &uploads,
            VehicleKind::Gas,
            gas_draft("Kia"),
            photo(),
            Some(&missing),
        )
        .await;
        assert!(matches!(result, Err(AppErrors::NotFound)));
        assert_eq!(stored_files(&dir), 0);
    }
}
