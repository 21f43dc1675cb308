pub mod entities;

use crate::catalog::sort::{SortDirection, SortField, SortOrder};
use crate::db::errors::DBError;
use crate::db::financing_application::FinancingApplication as InnerFinancingApplication;
use crate::db::staff_user::{normalize_email, StaffUser as InnerStaffUser};
use crate::db::vehicle::{
    ElectricSpecs, GasSpecs, Vehicle as InnerVehicle, VehicleKind, VehicleSpecs, VehicleStatus,
};
use crate::db::vehicle_filter::{Bounds, FacetField, PriceYearBounds, TextMatch, VehicleFilter};
use chrono::{DateTime, Utc};
use entities::{prelude::*, *};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Schema, Select,
    Set,
};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct RelationalDB {
    pub connection: DatabaseConnection,
}

#[derive(Debug, FromQueryResult)]
struct BoundsRow {
    min_price: Option<f64>,
    max_price: Option<f64>,
    min_year: Option<i32>,
    max_year: Option<i32>,
}

impl RelationalDB {
    pub fn init(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Creates missing tables.
    pub async fn create_tables(&self) -> Result<(), DBError> {
        let backend = self.connection.get_database_backend();
        let schema = Schema::new(backend);
        let mut statements = vec![
            schema.create_table_from_entity(Vehicle),
            schema.create_table_from_entity(StaffUser),
            schema.create_table_from_entity(FinancingApplication),
        ];
        for statement in statements.iter_mut() {
            statement.if_not_exists();
            self.connection.execute(backend.build(&*statement)).await?;
        }
        Ok(())
    }

    pub async fn close(self) -> Result<(), DBError> {
        self.connection.close().await?;
        Ok(())
    }

    pub async fn find_vehicles(
        &self,
        filter: &VehicleFilter,
        sort: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<InnerVehicle>, DBError> {
        let vehicles = select_vehicles(filter, sort)
            .offset(skip)
            .limit(limit)
            .all(&self.connection)
            .await?;
        vehicles.into_iter().map(InnerVehicle::try_from).collect()
    }

    pub async fn count_vehicles(&self, filter: &VehicleFilter) -> Result<u64, DBError> {
        let count = Vehicle::find()
            .filter(condition(filter))
            .count(&self.connection)
            .await?;
        Ok(count)
    }

    pub async fn distinct_values(
        &self,
        field: FacetField,
        filter: &VehicleFilter,
    ) -> Result<Vec<String>, DBError> {
        let column = facet_column(field);
        let values: Vec<Option<String>> = Vehicle::find()
            .select_only()
            .column(column)
            .distinct()
            .filter(condition(filter))
            .into_tuple()
            .all(&self.connection)
            .await?;
        let mut values: Vec<String> = values
            .into_iter()
            .flatten()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    pub async fn price_year_bounds(
        &self,
        filter: &VehicleFilter,
    ) -> Result<Option<PriceYearBounds>, DBError> {
        let row = Vehicle::find()
            .select_only()
            .column_as(Expr::col(vehicle::Column::Price).min(), "min_price")
            .column_as(Expr::col(vehicle::Column::Price).max(), "max_price")
            .column_as(Expr::col(vehicle::Column::Year).min(), "min_year")
            .column_as(Expr::col(vehicle::Column::Year).max(), "max_year")
            .filter(condition(filter))
            .into_model::<BoundsRow>()
            .one(&self.connection)
            .await?;
        Ok(row.and_then(|row| {
            Some(PriceYearBounds {
                min_price: row.min_price?,
                max_price: row.max_price?,
                min_year: row.min_year?,
                max_year: row.max_year?,
            })
        }))
    }

    /// One `UPDATE ... RETURNING`, so concurrent views never lose an increment.
    pub async fn view_vehicle(
        &self,
        kind: VehicleKind,
        id: Uuid,
    ) -> Result<Option<InnerVehicle>, DBError> {
        let updated = Vehicle::update_many()
            .col_expr(
                vehicle::Column::Views,
                Expr::col(vehicle::Column::Views).add(1),
            )
            .filter(vehicle::Column::Id.eq(id))
            .filter(vehicle::Column::Kind.eq(kind.as_str()))
            .exec_with_returning(&self.connection)
            .await?;
        updated.into_iter().next().map(InnerVehicle::try_from).transpose()
    }

    pub async fn get_vehicle(
        &self,
        kind: VehicleKind,
        id: Uuid,
    ) -> Result<Option<InnerVehicle>, DBError> {
        let vehicle = Vehicle::find_by_id(id)
            .filter(vehicle::Column::Kind.eq(kind.as_str()))
            .one(&self.connection)
            .await?;
        vehicle.map(InnerVehicle::try_from).transpose()
    }

    pub async fn insert_vehicle(&self, vehicle: InnerVehicle) -> Result<InnerVehicle, DBError> {
        let model = active_vehicle(&vehicle).insert(&self.connection).await?;
        InnerVehicle::try_from(model)
    }

    pub async fn replace_vehicle(
        &self,
        vehicle: InnerVehicle,
    ) -> Result<Option<InnerVehicle>, DBError> {
        if self.get_vehicle(vehicle.kind(), vehicle.id).await?.is_none() {
            return Ok(None);
        }
        let model = active_vehicle(&vehicle).update(&self.connection).await?;
        InnerVehicle::try_from(model).map(Some)
    }

    pub async fn delete_vehicle(&self, kind: VehicleKind, id: Uuid) -> Result<bool, DBError> {
        let result = Vehicle::delete_many()
            .filter(vehicle::Column::Id.eq(id))
            .filter(vehicle::Column::Kind.eq(kind.as_str()))
            .exec(&self.connection)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<InnerStaffUser>, DBError> {
        let user = StaffUser::find()
            .filter(staff_user::Column::Email.eq(normalize_email(email)))
            .one(&self.connection)
            .await?;
        Ok(user.map(InnerStaffUser::from))
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<InnerStaffUser>, DBError> {
        let user = StaffUser::find_by_id(id).one(&self.connection).await?;
        Ok(user.map(InnerStaffUser::from))
    }

    pub async fn all_users(&self) -> Result<Vec<InnerStaffUser>, DBError> {
        let users = StaffUser::find()
            .order_by_asc(staff_user::Column::CreatedAt)
            .all(&self.connection)
            .await?;
        Ok(users.into_iter().map(InnerStaffUser::from).collect())
    }

    pub async fn insert_user(&self, user: InnerStaffUser) -> Result<InnerStaffUser, DBError> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(DBError::DuplicateEmail);
        }
        let model = staff_user::ActiveModel {
            id: Set(user.id),
            name: Set(user.name),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            is_admin: Set(user.is_admin),
            created_at: Set(user.created_at),
        }
        .insert(&self.connection)
        .await?;
        Ok(model.into())
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool, DBError> {
        let result = StaffUser::delete_by_id(id).exec(&self.connection).await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn insert_financing(
        &self,
        application: InnerFinancingApplication,
    ) -> Result<InnerFinancingApplication, DBError> {
        let model = financing_application::ActiveModel {
            id: Set(application.id),
            submitted_at: Set(application.submitted_at),
            applicant_email: Set(application.applicant_email),
            applicant_name: Set(application.applicant_name),
            vehicle: Set(application.vehicle),
            details: Set(application.details),
        }
        .insert(&self.connection)
        .await?;
        Ok(model.into())
    }

    pub async fn has_financing_since(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, DBError> {
        let count = FinancingApplication::find()
            .filter(financing_application::Column::ApplicantEmail.eq(normalize_email(email)))
            .filter(financing_application::Column::SubmittedAt.gte(since))
            .count(&self.connection)
            .await?;
        Ok(count > 0)
    }

    pub async fn all_financing(&self) -> Result<Vec<InnerFinancingApplication>, DBError> {
        let applications = FinancingApplication::find()
            .order_by_desc(financing_application::Column::SubmittedAt)
            .all(&self.connection)
            .await?;
        Ok(applications.into_iter().map(|model| model.into()).collect())
    }
}

pub fn select_vehicles(filter: &VehicleFilter, sort: SortOrder) -> Select<Vehicle> {
    let order = match sort.direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    Vehicle::find()
        .filter(condition(filter))
        .order_by(sort_column(sort.field), order)
        .order_by_desc(vehicle::Column::CreatedAt)
        .order_by_asc(vehicle::Column::Id)
}

fn sort_column(field: SortField) -> vehicle::Column {
    match field {
        SortField::Date => vehicle::Column::CreatedAt,
        SortField::Price => vehicle::Column::Price,
        SortField::Year => vehicle::Column::Year,
        SortField::Mileage => vehicle::Column::Mileage,
        SortField::Brand => vehicle::Column::Brand,
        SortField::Range => vehicle::Column::Range,
        SortField::TimeTo60 => vehicle::Column::Time60,
    }
}

fn facet_column(field: FacetField) -> vehicle::Column {
    match field {
        FacetField::Brand => vehicle::Column::Brand,
        FacetField::Model => vehicle::Column::Model,
        FacetField::Transmission => vehicle::Column::Transmission,
        FacetField::Body => vehicle::Column::Body,
        FacetField::Colour => vehicle::Column::Colour,
    }
}

fn text_condition(columns: &[vehicle::Column], matcher: &TextMatch) -> Condition {
    let mut any = Condition::any();
    for column in columns {
        for pattern in matcher.like_patterns() {
            any = any.add(
                Expr::expr(Func::lower(Expr::col(*column)))
                    .like(LikeExpr::new(pattern).escape('\\')),
            );
        }
    }
    any
}

fn bounds_condition<T>(column: vehicle::Column, bounds: &Bounds<T>) -> Condition
where
    T: Into<sea_orm::Value> + Copy,
{
    let mut all = Condition::all();
    if let Some(min) = bounds.min {
        all = all.add(column.gte(min));
    }
    if let Some(max) = bounds.max {
        all = all.add(column.lte(max));
    }
    all
}

/// Equivalent of `VehicleFilter::matches` as a SQL condition.
pub fn condition(filter: &VehicleFilter) -> Condition {
    let mut all = Condition::all();
    if let Some(kind) = filter.kind {
        all = all.add(vehicle::Column::Kind.eq(kind.as_str()));
    }
    if let Some(status) = filter.status {
        all = all.add(vehicle::Column::Status.eq(status.as_str()));
    }
    if let Some(id) = filter.exclude_id {
        all = all.add(vehicle::Column::Id.ne(id));
    }
    if let Some(brand) = &filter.brand_is {
        all = all.add(vehicle::Column::Brand.eq(brand.as_str()));
    }
    let text_fields = [
        (&filter.brand, vehicle::Column::Brand),
        (&filter.model, vehicle::Column::Model),
        (&filter.transmission, vehicle::Column::Transmission),
        (&filter.body, vehicle::Column::Body),
        (&filter.colour, vehicle::Column::Colour),
    ];
    for (matcher, column) in text_fields {
        if let Some(matcher) = matcher {
            all = all.add(text_condition(&[column], matcher));
        }
    }
    all = all
        .add(bounds_condition(vehicle::Column::Price, &filter.price))
        .add(bounds_condition(vehicle::Column::Year, &filter.year))
        .add(bounds_condition(vehicle::Column::Mileage, &filter.mileage))
        .add(bounds_condition(vehicle::Column::Range, &filter.range));
    if let Some(search) = &filter.search {
        all = all.add(text_condition(
            &[
                vehicle::Column::Title,
                vehicle::Column::Brand,
                vehicle::Column::Model,
                vehicle::Column::Description,
                vehicle::Column::Trim,
                vehicle::Column::StockNumber,
                vehicle::Column::Vin,
            ],
            search,
        ));
    }
    if let Some(similar) = &filter.similar_to {
        all = all.add(
            Condition::any()
                .add(vehicle::Column::Brand.eq(similar.brand.as_str()))
                .add(bounds_condition(vehicle::Column::Price, &similar.price)),
        );
    }
    all
}

fn active_vehicle(vehicle: &InnerVehicle) -> vehicle::ActiveModel {
    let (gas, electric) = match &vehicle.specs {
        VehicleSpecs::Gas(gas) => (Some(gas), None),
        VehicleSpecs::Electric(electric) => (None, Some(electric)),
    };
    vehicle::ActiveModel {
        id: Set(vehicle.id),
        kind: Set(vehicle.kind().as_str().to_string()),
        title: Set(vehicle.title.clone()),
        brand: Set(vehicle.brand.clone()),
        model: Set(vehicle.model.clone()),
        year: Set(vehicle.year),
        price: Set(vehicle.price),
        price_str: Set(vehicle.price_str.clone()),
        status: Set(vehicle.status.as_str().to_string()),
        views: Set(vehicle.views as i64),
        images: Set(serde_json::json!(vehicle.images)),
        colour: Set(vehicle.colour.clone()),
        interior: Set(vehicle.interior.clone()),
        wheel: Set(vehicle.wheel.clone()),
        description: Set(vehicle.description.clone()),
        safety: Set(vehicle.safety.clone()),
        top_speed: Set(vehicle.top_speed),
        time60: Set(vehicle.time60),
        trim: Set(vehicle.trim.clone()),
        stock_number: Set(vehicle.stock_number.clone()),
        vin: Set(vehicle.vin.clone()),
        created_at: Set(vehicle.created_at),
        mileage: Set(gas.map(|gas| gas.mileage)),
        engine: Set(gas.map(|gas| gas.engine)),
        cylinders: Set(gas.map(|gas| gas.cylinders as i32)),
        gearbox: Set(gas.map(|gas| gas.gearbox.clone())),
        transmission: Set(gas.map(|gas| gas.transmission.clone())),
        body: Set(gas.map(|gas| gas.body.clone())),
        drivetrain: Set(gas.map(|gas| gas.drivetrain.clone())),
        technology: Set(gas.map(|gas| gas.technology.clone())),
        trim_line: Set(electric.map(|electric| electric.trim_line.clone())),
        range: Set(electric.map(|electric| electric.range)),
        range_description: Set(electric.map(|electric| electric.range_description.clone())),
    }
}

impl TryFrom<vehicle::Model> for InnerVehicle {
    type Error = DBError;

    fn try_from(model: vehicle::Model) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| DBError::CorruptRecord(format!("vehicle {}: {what}", model.id));
        let kind: VehicleKind = model.kind.parse().map_err(|_| corrupt("unknown kind"))?;
        let status: VehicleStatus = model
            .status
            .parse()
            .map_err(|_| corrupt("unknown status"))?;
        let images: Vec<String> =
            serde_json::from_value(model.images.clone()).map_err(|_| corrupt("bad image list"))?;
        let specs = match kind {
            VehicleKind::Gas => VehicleSpecs::Gas(GasSpecs {
                mileage: model.mileage.unwrap_or_default(),
                engine: model.engine.unwrap_or_default(),
                cylinders: model.cylinders.unwrap_or_default().max(0) as u32,
                gearbox: model.gearbox.clone().unwrap_or_default(),
                transmission: model.transmission.clone().unwrap_or_default(),
                body: model.body.clone().unwrap_or_default(),
                drivetrain: model.drivetrain.clone().unwrap_or_default(),
                technology: model.technology.clone().unwrap_or_default(),
            }),
            VehicleKind::Electric => VehicleSpecs::Electric(ElectricSpecs {
                trim_line: model.trim_line.clone().unwrap_or_default(),
                range: model.range.unwrap_or_default(),
                range_description: model.range_description.clone().unwrap_or_default(),
            }),
        };
        Ok(Self {
            id: model.id,
            title: model.title,
            brand: model.brand,
            model: model.model,
            year: model.year,
            price: model.price,
            price_str: model.price_str,
            status,
            views: model.views.max(0) as u64,
            images,
            colour: model.colour,
            interior: model.interior,
            wheel: model.wheel,
            description: model.description,
            safety: model.safety,
            top_speed: model.top_speed,
            time60: model.time60,
            trim: model.trim,
            stock_number: model.stock_number,
            vin: model.vin,
            created_at: model.created_at,
            specs,
        })
    }
}

impl From<staff_user::Model> for InnerStaffUser {
    fn from(model: staff_user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            password_hash: model.password_hash,
            is_admin: model.is_admin,
            created_at: model.created_at,
        }
    }
}

impl From<financing_application::Model> for InnerFinancingApplication {
    fn from(model: financing_application::Model) -> Self {
        Self {
            id: model.id,
            submitted_at: model.submitted_at,
            applicant_email: model.applicant_email,
            applicant_name: model.applicant_name,
            vehicle: model.vehicle,
            details: model.details,
        }
    }
}
