use sea_orm::entity::prelude::*;

/// Gas and electric listings share one table; `kind` tells them apart and
/// the columns specific to the other kind stay null.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    pub price_str: String,
    pub status: String,
    pub views: i64,
    pub images: Json,
    pub colour: String,
    pub interior: String,
    pub wheel: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub safety: String,
    #[sea_orm(column_type = "Double")]
    pub top_speed: f64,
    #[sea_orm(column_type = "Double")]
    pub time60: f64,
    pub trim: Option<String>,
    pub stock_number: Option<String>,
    pub vin: Option<String>,
    pub created_at: DateTimeUtc,
    #[sea_orm(column_type = "Double", nullable)]
    pub mileage: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub engine: Option<f64>,
    pub cylinders: Option<i32>,
    pub gearbox: Option<String>,
    pub transmission: Option<String>,
    pub body: Option<String>,
    pub drivetrain: Option<String>,
    pub technology: Option<String>,
    pub trim_line: Option<String>,
    #[sea_orm(column_type = "Double", nullable)]
    pub range: Option<f64>,
    pub range_description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
