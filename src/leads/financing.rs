use crate::configuration::MailSettings;
use crate::data_models::Receipt;
use crate::db::staff_user::normalize_email;
use crate::db::{Database, ExternalText, FinancingApplication};
use crate::errors::AppErrors;
use crate::leads::{
    int_between, is_blank, is_true, number_at_least, staff_recipient, FieldChecks,
    LICENSE_EXPIRY, PHONE, SSN, VIN, ZIP,
};
use crate::mailer::{Email, Mailer};
use crate::templates::{FinancingMail, MailRow};
use askama::Template;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

pub const RESIDENCE_TYPES: [&str; 3] = ["Own", "Rent", "Other"];
pub const EMPLOYER_TYPES: [&str; 6] = [
    "Full-time",
    "Part-time",
    "Self-employed",
    "Retired",
    "Unemployed",
    "Student",
];
pub const MIN_VEHICLE_YEAR: i64 = 2010;
pub const MIN_APPLICANT_AGE: u32 = 18;
pub const DUPLICATE_WINDOW_HOURS: i64 = 24;
pub const DUPLICATE_MESSAGE: &str = "You have already submitted an application in the last 24 hours. Please wait before submitting another application.";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CoBuyerDetails {
    #[validate(length(min = 2, max = 50, message = "Co-Buyer First Name is required"))]
    pub co_buyer_first_name: String,
    pub co_buyer_middle_initial: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Co-Buyer Last Name is required"))]
    pub co_buyer_last_name: String,
    #[validate(email(message = "Co-Buyer Email must be a valid email address"))]
    pub co_buyer_email: String,
    pub co_buyer_mobile_phone: String,
    pub co_buyer_home_phone: Option<String>,
    #[serde(rename = "coBuyerSSN")]
    pub co_buyer_ssn: String,
    #[serde(rename = "coBuyerDOB")]
    pub co_buyer_dob: String,
    #[validate(length(min = 5, max = 100, message = "Co-Buyer Address Line 1 is required"))]
    pub co_buyer_address1: String,
    pub co_buyer_address2: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Co-Buyer City is required"))]
    pub co_buyer_city: String,
    #[validate(length(equal = 2, message = "Co-Buyer State is required"))]
    pub co_buyer_state: String,
    pub co_buyer_zip: String,
    pub co_buyer_time_at_residence_years: String,
    pub co_buyer_time_at_residence_months: String,
    pub co_buyer_residence_type: String,
    pub co_buyer_rent_mortgage: String,
    #[validate(length(min = 2, max = 100, message = "Co-Buyer Employer Name is required"))]
    pub co_buyer_employer_name: String,
    pub co_buyer_employer_type: String,
    pub co_buyer_monthly_income: String,
    #[validate(length(min = 2, max = 50, message = "Co-Buyer Occupation is required"))]
    pub co_buyer_occupation: String,
    #[validate(length(min = 5, max = 100, message = "Co-Buyer Employer Address Line 1 is required"))]
    pub co_buyer_employer_address1: String,
    pub co_buyer_employer_address2: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Co-Buyer Employer City is required"))]
    pub co_buyer_employer_city: String,
    #[validate(length(equal = 2, message = "Co-Buyer Employer State is required"))]
    pub co_buyer_employer_state: String,
    pub co_buyer_employer_zip: String,
    pub co_buyer_work_phone: Option<String>,
    #[validate(length(min = 1, message = "Co-Buyer Driver's License Number is required"))]
    pub co_buyer_driver_license_number: String,
    #[validate(length(equal = 2, message = "Co-Buyer Driver's License State is required"))]
    pub co_buyer_driver_license_state: String,
    pub co_buyer_driver_license_exp: String,
    pub co_buyer_time_on_job_years: String,
    pub co_buyer_time_on_job_months: String,
}

impl CoBuyerDetails {
    fn check(&self) -> Result<(), ValidationErrors> {
        let mut checks = FieldChecks::start(self.validate());
        checks.require(
            PHONE.is_match(&self.co_buyer_mobile_phone),
            "co_buyer_mobile_phone",
            "Co-Buyer Phone must be in format (XXX) XXX-XXXX",
        );
        checks.require(
            SSN.is_match(&self.co_buyer_ssn),
            "co_buyer_ssn",
            "Co-Buyer SSN must be in format XXX-XX-XXXX",
        );
        checks.require(
            parse_date(&self.co_buyer_dob).is_some(),
            "co_buyer_dob",
            "Co-Buyer Date of Birth is required",
        );
        checks.require(
            ZIP.is_match(&self.co_buyer_zip),
            "co_buyer_zip",
            "Co-Buyer ZIP code must be in format XXXXX or XXXXX-XXXX",
        );
        checks.require(
            int_between(&self.co_buyer_time_at_residence_years, 0, 50),
            "co_buyer_time_at_residence_years",
            "Co-Buyer Years at residence must be between 0 and 50",
        );
        checks.require(
            int_between(&self.co_buyer_time_at_residence_months, 0, 11),
            "co_buyer_time_at_residence_months",
            "Co-Buyer Months at residence must be between 0 and 11",
        );
        checks.require(
            RESIDENCE_TYPES.contains(&self.co_buyer_residence_type.as_str()),
            "co_buyer_residence_type",
            "Co-Buyer Residence Type is required",
        );
        checks.require(
            number_at_least(&self.co_buyer_rent_mortgage, 0.0),
            "co_buyer_rent_mortgage",
            "Co-Buyer Monthly Rent/Mortgage must be a non-negative number",
        );
        checks.require(
            EMPLOYER_TYPES.contains(&self.co_buyer_employer_type.as_str()),
            "co_buyer_employer_type",
            "Co-Buyer Employer Type is required",
        );
        checks.require(
            income_in_range(&self.co_buyer_monthly_income),
            "co_buyer_monthly_income",
            "Co-Buyer Monthly Income must be between $1,000 and $1,000,000",
        );
        checks.require(
            ZIP.is_match(&self.co_buyer_employer_zip),
            "co_buyer_employer_zip",
            "Co-Buyer Employer ZIP code must be in format XXXXX or XXXXX-XXXX",
        );
        checks.require(
            optional_phone(&self.co_buyer_work_phone),
            "co_buyer_work_phone",
            "Co-Buyer Work Phone must be in format (XXX) XXX-XXXX",
        );
        checks.require(
            LICENSE_EXPIRY.is_match(&self.co_buyer_driver_license_exp),
            "co_buyer_driver_license_exp",
            "Co-Buyer Driver's License Expiration must be in MM/YY format",
        );
        checks.require(
            int_between(&self.co_buyer_time_on_job_years, 0, 50),
            "co_buyer_time_on_job_years",
            "Co-Buyer Years on job must be between 0 and 50",
        );
        checks.require(
            int_between(&self.co_buyer_time_on_job_months, 0, 11),
            "co_buyer_time_on_job_months",
            "Co-Buyer Months on job must be between 0 and 11",
        );
        checks.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct FinancingForm {
    #[validate(length(min = 2, max = 50, message = "First name must be between 2 and 50 characters"))]
    pub applicant_first_name: String,
    pub applicant_middle_initial: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Last name must be between 2 and 50 characters"))]
    pub applicant_last_name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub applicant_email: String,
    pub applicant_mobile_phone: String,
    pub applicant_home_phone: Option<String>,
    #[serde(rename = "applicantSSN")]
    pub applicant_ssn: String,
    #[serde(rename = "applicantDOB")]
    pub applicant_dob: String,
    #[validate(length(min = 5, max = 100, message = "Address must be between 5 and 100 characters"))]
    pub applicant_address1: String,
    pub applicant_address2: Option<String>,
    #[validate(length(min = 2, max = 50, message = "City must be between 2 and 50 characters"))]
    pub applicant_city: String,
    #[validate(length(equal = 2, message = "Please select a valid state"))]
    pub applicant_state: String,
    pub applicant_zip: String,
    pub time_at_residence_years: String,
    pub time_at_residence_months: String,
    pub residence_type: String,
    pub rent_mortgage: String,
    #[validate(length(min = 1, message = "Driver's License Number is required"))]
    pub applicant_driver_license_number: String,
    #[validate(length(equal = 2, message = "Driver's License State is required"))]
    pub applicant_driver_license_state: String,
    pub applicant_driver_license_exp: String,

    #[validate(length(min = 2, max = 100, message = "Employer name must be between 2 and 100 characters"))]
    pub employer_name: String,
    pub employer_type: String,
    pub monthly_income: String,
    #[validate(length(min = 2, max = 50, message = "Occupation must be between 2 and 50 characters"))]
    pub occupation: String,
    #[validate(length(min = 5, max = 100, message = "Employer Address Line 1 is required"))]
    pub employer_address1: String,
    pub employer_address2: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Employer City is required"))]
    pub employer_city: String,
    #[validate(length(equal = 2, message = "Employer State is required"))]
    pub employer_state: String,
    pub employer_zip: String,
    pub work_phone: Option<String>,
    pub time_on_job_years: String,
    pub time_on_job_months: String,

    pub has_co_buyer: String,
    #[serde(flatten)]
    pub co_buyer: CoBuyerDetails,

    pub vehicle_year: String,
    #[validate(length(min = 1, max = 50, message = "Vehicle make is required"))]
    pub vehicle_make: String,
    #[validate(length(min = 1, max = 50, message = "Vehicle model is required"))]
    pub vehicle_model: String,
    pub vehicle_vin: String,
    pub vehicle_mileage: String,
    pub vehicle_price: Option<String>,
    pub down_payment: Option<String>,
    #[validate(length(max = 50, message = "Vehicle trim too long"))]
    pub vehicle_trim: Option<String>,
    #[validate(length(max = 50, message = "Stock number too long"))]
    pub stock_number: Option<String>,

    #[validate(length(max = 1000, message = "Additional comments too long"))]
    pub additional_comments: Option<String>,
    pub acknowledgment_consent: String,
    pub credit_check_consent: String,
    pub text_message_consent: Option<String>,
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn income_in_range(raw: &str) -> bool {
    raw.trim()
        .parse::<f64>()
        .map_or(false, |income| (1000.0..=1_000_000.0).contains(&income))
}

fn optional_phone(raw: &Option<String>) -> bool {
    raw.as_deref().map_or(true, |phone| is_blank(phone) || PHONE.is_match(phone.trim()))
}

fn optional_number_at_least(raw: &Option<String>, min: f64) -> bool {
    raw.as_deref()
        .map_or(true, |value| is_blank(value) || number_at_least(value, min))
}

/// Last four digits only.
fn mask_ssn(ssn: &str) -> String {
    let digits: String = ssn.chars().filter(char::is_ascii_digit).collect();
    let last_four = digits.get(digits.len().saturating_sub(4)..).unwrap_or_default();
    format!("***-**-{last_four}")
}

impl ExternalText for CoBuyerDetails {
    fn cleaned(&self) -> Self {
        Self {
            co_buyer_first_name: self.clean(&self.co_buyer_first_name),
            co_buyer_middle_initial: self.clean_optional(&self.co_buyer_middle_initial),
            co_buyer_last_name: self.clean(&self.co_buyer_last_name),
            co_buyer_email: normalize_email(&self.co_buyer_email),
            co_buyer_mobile_phone: self.co_buyer_mobile_phone.trim().to_string(),
            co_buyer_home_phone: self.clean_optional(&self.co_buyer_home_phone),
            co_buyer_ssn: self.co_buyer_ssn.trim().to_string(),
            co_buyer_dob: self.co_buyer_dob.trim().to_string(),
            co_buyer_address1: self.clean(&self.co_buyer_address1),
            co_buyer_address2: self.clean_optional(&self.co_buyer_address2),
            co_buyer_city: self.clean(&self.co_buyer_city),
            co_buyer_state: self.co_buyer_state.trim().to_uppercase(),
            co_buyer_zip: self.co_buyer_zip.trim().to_string(),
            co_buyer_employer_address1: self.clean(&self.co_buyer_employer_address1),
            co_buyer_employer_address2: self.clean_optional(&self.co_buyer_employer_address2),
            co_buyer_employer_city: self.clean(&self.co_buyer_employer_city),
            co_buyer_employer_state: self.co_buyer_employer_state.trim().to_uppercase(),
            co_buyer_employer_zip: self.co_buyer_employer_zip.trim().to_string(),
            co_buyer_employer_name: self.clean(&self.co_buyer_employer_name),
            co_buyer_occupation: self.clean(&self.co_buyer_occupation),
            co_buyer_work_phone: self.clean_optional(&self.co_buyer_work_phone),
            co_buyer_driver_license_number: self.clean(&self.co_buyer_driver_license_number),
            co_buyer_driver_license_state: self.co_buyer_driver_license_state.trim().to_uppercase(),
            co_buyer_driver_license_exp: self.co_buyer_driver_license_exp.trim().to_string(),
            ..self.clone()
        }
    }
}

impl ExternalText for FinancingForm {
    fn cleaned(&self) -> Self {
        Self {
            applicant_first_name: self.clean(&self.applicant_first_name),
            applicant_middle_initial: self.clean_optional(&self.applicant_middle_initial),
            applicant_last_name: self.clean(&self.applicant_last_name),
            applicant_email: normalize_email(&self.applicant_email),
            applicant_mobile_phone: self.applicant_mobile_phone.trim().to_string(),
            applicant_home_phone: self.clean_optional(&self.applicant_home_phone),
            applicant_ssn: self.applicant_ssn.trim().to_string(),
            applicant_dob: self.applicant_dob.trim().to_string(),
            applicant_address1: self.clean(&self.applicant_address1),
            applicant_address2: self.clean_optional(&self.applicant_address2),
            applicant_city: self.clean(&self.applicant_city),
            applicant_state: self.applicant_state.trim().to_uppercase(),
            applicant_zip: self.applicant_zip.trim().to_string(),
            applicant_driver_license_number: self.clean(&self.applicant_driver_license_number),
            applicant_driver_license_state: self.applicant_driver_license_state.trim().to_uppercase(),
            applicant_driver_license_exp: self.applicant_driver_license_exp.trim().to_string(),
            employer_name: self.clean(&self.employer_name),
            occupation: self.clean(&self.occupation),
            employer_address1: self.clean(&self.employer_address1),
            employer_address2: self.clean_optional(&self.employer_address2),
            employer_city: self.clean(&self.employer_city),
            employer_state: self.employer_state.trim().to_uppercase(),
            employer_zip: self.employer_zip.trim().to_string(),
            work_phone: self.clean_optional(&self.work_phone),
            co_buyer: if self.has_co_buyer() {
                self.co_buyer.cleaned()
            } else {
                CoBuyerDetails::default()
            },
            vehicle_make: self.clean(&self.vehicle_make),
            vehicle_model: self.clean(&self.vehicle_model),
            vehicle_vin: self.vehicle_vin.trim().to_uppercase(),
            vehicle_trim: self.clean_optional(&self.vehicle_trim),
            stock_number: self.clean_optional(&self.stock_number),
            additional_comments: self
                .additional_comments
                .as_deref()
                .map(str::trim)
                .filter(|comments| !comments.is_empty())
                .map(str::to_string),
            ..self.clone()
        }
    }
}

impl FinancingForm {
    pub fn has_co_buyer(&self) -> bool {
        is_true(&self.has_co_buyer)
    }

    pub fn applicant_name(&self) -> String {
        format!("{} {}", self.applicant_first_name, self.applicant_last_name)
    }

    pub fn vehicle(&self) -> String {
        format!(
            "{} {} {}",
            self.vehicle_year.trim(),
            self.vehicle_make,
            self.vehicle_model
        )
    }

    pub fn check(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let mut checks = FieldChecks::start(self.validate());
        checks.require(
            PHONE.is_match(&self.applicant_mobile_phone),
            "applicant_mobile_phone",
            "Phone must be in format (XXX) XXX-XXXX",
        );
        checks.require(
            SSN.is_match(&self.applicant_ssn),
            "applicant_ssn",
            "SSN must be in format XXX-XX-XXXX",
        );
        match parse_date(&self.applicant_dob) {
            Some(dob) => checks.require(
                today.years_since(dob).unwrap_or(0) >= MIN_APPLICANT_AGE,
                "applicant_dob",
                "Applicant must be at least 18 years old",
            ),
            None => checks.require(
                false,
                "applicant_dob",
                "Please provide a valid date of birth (YYYY-MM-DD)",
            ),
        }
        checks.require(
            ZIP.is_match(&self.applicant_zip),
            "applicant_zip",
            "ZIP code must be in format XXXXX or XXXXX-XXXX",
        );
        checks.require(
            int_between(&self.time_at_residence_years, 0, 50),
            "time_at_residence_years",
            "Years at residence must be between 0 and 50",
        );
        checks.require(
            int_between(&self.time_at_residence_months, 0, 11),
            "time_at_residence_months",
            "Months at residence must be between 0 and 11",
        );
        checks.require(
            RESIDENCE_TYPES.contains(&self.residence_type.trim()),
            "residence_type",
            "Please select a valid residence type",
        );
        checks.require(
            number_at_least(&self.rent_mortgage, 0.0),
            "rent_mortgage",
            "Monthly rent/mortgage must be a non-negative number",
        );
        checks.require(
            LICENSE_EXPIRY.is_match(&self.applicant_driver_license_exp),
            "applicant_driver_license_exp",
            "Driver's License Expiration must be in MM/YY format",
        );
        checks.require(
            EMPLOYER_TYPES.contains(&self.employer_type.trim()),
            "employer_type",
            "Please select a valid employer type",
        );
        checks.require(
            income_in_range(&self.monthly_income),
            "monthly_income",
            "Monthly income must be between $1,000 and $1,000,000",
        );
        checks.require(
            ZIP.is_match(&self.employer_zip),
            "employer_zip",
            "Employer ZIP code must be in format XXXXX or XXXXX-XXXX",
        );
        checks.require(
            int_between(&self.time_on_job_years, 0, 50),
            "time_on_job_years",
            "Years on job must be between 0 and 50",
        );
        checks.require(
            int_between(&self.time_on_job_months, 0, 11),
            "time_on_job_months",
            "Months on job must be between 0 and 11",
        );
        checks.require(
            optional_phone(&self.work_phone),
            "work_phone",
            "Work Phone must be in format (XXX) XXX-XXXX",
        );
        checks.require(
            int_between(
                &self.vehicle_year,
                MIN_VEHICLE_YEAR,
                i64::from(today.year()) + 1,
            ),
            "vehicle_year",
            "Invalid vehicle year",
        );
        checks.require(
            VIN.is_match(&self.vehicle_vin),
            "vehicle_vin",
            "VIN must be 17 alphanumeric characters (excluding I, O, Q)",
        );
        checks.require(
            int_between(&self.vehicle_mileage, 0, i64::MAX),
            "vehicle_mileage",
            "Vehicle mileage must be a non-negative number",
        );
        checks.require(
            optional_number_at_least(&self.vehicle_price, 1000.0),
            "vehicle_price",
            "Vehicle price must be at least $1,000",
        );
        checks.require(
            optional_number_at_least(&self.down_payment, 0.0),
            "down_payment",
            "Down payment must be a non-negative number",
        );
        checks.require(
            is_true(&self.acknowledgment_consent),
            "acknowledgment_consent",
            "Acknowledgment consent is required",
        );
        checks.require(
            is_true(&self.credit_check_consent),
            "credit_check_consent",
            "Credit check consent is required",
        );
        checks.require(
            self.text_message_consent
                .as_deref()
                .map_or(true, |consent| matches!(consent.trim(), "true" | "false")),
            "text_message_consent",
            "Text message consent must be a boolean value",
        );

        if self.has_co_buyer() {
            checks.absorb(self.co_buyer.check());
        }
        checks.finish()
    }

    fn staff_html(&self, reference: &str) -> Result<String, askama::Error> {
        let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        let mut rows = vec![
            MailRow::new("Applicant", self.applicant_name()),
            MailRow::new("Email", self.applicant_email.clone()),
            MailRow::new("Mobile phone", self.applicant_mobile_phone.clone()),
            MailRow::new("SSN", mask_ssn(&self.applicant_ssn)),
            MailRow::new("Date of birth", self.applicant_dob.clone()),
            MailRow::new(
                "Address",
                format!(
                    "{}, {}, {} {}",
                    self.applicant_address1, self.applicant_city, self.applicant_state, self.applicant_zip
                ),
            ),
            MailRow::new(
                "Residence",
                format!(
                    "{} ({}y {}m), {}/month",
                    self.residence_type,
                    self.time_at_residence_years,
                    self.time_at_residence_months,
                    self.rent_mortgage
                ),
            ),
            MailRow::new(
                "Employer",
                format!("{} ({}), {}", self.employer_name, self.employer_type, self.occupation),
            ),
            MailRow::new("Monthly income", self.monthly_income.clone()),
            MailRow::new("Vehicle", self.vehicle()),
            MailRow::new("VIN", self.vehicle_vin.clone()),
            MailRow::new("Mileage", self.vehicle_mileage.clone()),
            MailRow::new("Price", or_dash(&self.vehicle_price)),
            MailRow::new("Down payment", or_dash(&self.down_payment)),
            MailRow::new("Stock number", or_dash(&self.stock_number)),
        ];
        if self.has_co_buyer() {
            let co = &self.co_buyer;
            rows.push(MailRow::new(
                "Co-buyer",
                format!("{} {} ({})", co.co_buyer_first_name, co.co_buyer_last_name, co.co_buyer_email),
            ));
            rows.push(MailRow::new("Co-buyer SSN", mask_ssn(&co.co_buyer_ssn)));
            rows.push(MailRow::new("Co-buyer monthly income", co.co_buyer_monthly_income.clone()));
        }
        rows.push(MailRow::new("Comments", or_dash(&self.additional_comments)));
        FinancingMail { reference, rows }.render()
    }
}

lazy_static! {
    // Held from the duplicate check until the insert. Only covers this
    // process; several instances on one database can still both pass the check.
    static ref FINANCING_INTAKE: Mutex<()> = Mutex::new(());
}

/// Validates, stores and announces a financing application. A failing
/// notification is logged; the application stays stored.
pub async fn submit_financing(
    db: &Database,
    mailer: &dyn Mailer,
    settings: &MailSettings,
    form: FinancingForm,
    now: DateTime<Utc>,
) -> Result<Receipt, AppErrors> {
    let form = form.cleaned();
    form.check(now.date_naive())?;
    let recipient = staff_recipient(settings)?.to_string();

    let intake = FINANCING_INTAKE.lock().await;
    let since = now - Duration::hours(DUPLICATE_WINDOW_HOURS);
    if db.has_financing_since(&form.applicant_email, since).await? {
        warn!("duplicate financing application from {}", form.applicant_email);
        return Err(AppErrors::Conflict(DUPLICATE_MESSAGE.to_string()));
    }

    let application = db
        .insert_financing(FinancingApplication {
            id: Uuid::new_v4(),
            submitted_at: now,
            applicant_email: form.applicant_email.clone(),
            applicant_name: form.applicant_name(),
            vehicle: form.vehicle(),
            details: serde_json::to_value(&form)?,
        })
        .await?;
    drop(intake);
    let reference = application.reference();
    info!(
        "financing application {reference} stored for {} ({})",
        form.applicant_email,
        form.vehicle()
    );

    match form.staff_html(&reference) {
        Ok(html) => {
            let email = Email::new(
                &recipient,
                format!("New Financing Application - {}", form.applicant_name()),
                html,
            )
            .reply_to(&form.applicant_email);
            if let Err(err) = mailer.send(email).await {
                warn!("financing application {reference} email failed: {err}");
            }
        }
        Err(err) => warn!("financing application {reference} email not rendered: {err}"),
    }

    Ok(Receipt::new(format!(
        "Your financing application has been submitted successfully! Our team will contact you within 24 hours. Reference ID: {reference}"
    ))
    .with_reference(reference))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::leads::contact::tests::mail_settings;
    use crate::mailer::MemoryMailer;
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn co_buyer() -> CoBuyerDetails {
        CoBuyerDetails {
            co_buyer_first_name: "Ana".to_string(),
            co_buyer_last_name: "Costa".to_string(),
            co_buyer_email: "ana@buyer.test".to_string(),
            co_buyer_mobile_phone: "(508) 555-0101".to_string(),
            co_buyer_ssn: "987-65-4321".to_string(),
            co_buyer_dob: "1990-03-04".to_string(),
            co_buyer_address1: "12 Elm Street".to_string(),
            co_buyer_city: "Boston".to_string(),
            co_buyer_state: "MA".to_string(),
            co_buyer_zip: "02134".to_string(),
            co_buyer_time_at_residence_years: "3".to_string(),
            co_buyer_time_at_residence_months: "0".to_string(),
            co_buyer_residence_type: "Rent".to_string(),
            co_buyer_rent_mortgage: "1500".to_string(),
            co_buyer_employer_name: "Acme".to_string(),
            co_buyer_employer_type: "Full-time".to_string(),
            co_buyer_monthly_income: "4000".to_string(),
            co_buyer_occupation: "Nurse".to_string(),
            co_buyer_employer_address1: "1 Main Street".to_string(),
            co_buyer_employer_city: "Boston".to_string(),
            co_buyer_employer_state: "MA".to_string(),
            co_buyer_employer_zip: "02110".to_string(),
            co_buyer_driver_license_number: "S1234567".to_string(),
            co_buyer_driver_license_state: "MA".to_string(),
            co_buyer_driver_license_exp: "09/28".to_string(),
            co_buyer_time_on_job_years: "2".to_string(),
            co_buyer_time_on_job_months: "6".to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn application() -> FinancingForm {
        FinancingForm {
            applicant_first_name: "Joao".to_string(),
            applicant_last_name: "Pereira".to_string(),
            applicant_email: "Joao@Buyer.test".to_string(),
            applicant_mobile_phone: "(774) 523-7860".to_string(),
            applicant_ssn: "123-45-6789".to_string(),
            applicant_dob: "1985-07-20".to_string(),
            applicant_address1: "45 Oak Avenue".to_string(),
            applicant_city: "Worcester".to_string(),
            applicant_state: "ma".to_string(),
            applicant_zip: "01602".to_string(),
            time_at_residence_years: "5".to_string(),
            time_at_residence_months: "11".to_string(),
            residence_type: "Own".to_string(),
            rent_mortgage: "0".to_string(),
            applicant_driver_license_number: "S7654321".to_string(),
            applicant_driver_license_state: "MA".to_string(),
            applicant_driver_license_exp: "1227".to_string(),
            employer_name: "Globex".to_string(),
            employer_type: "Self-employed".to_string(),
            monthly_income: "6500".to_string(),
            occupation: "Electrician".to_string(),
            employer_address1: "99 Industrial Way".to_string(),
            employer_city: "Worcester".to_string(),
            employer_state: "MA".to_string(),
            employer_zip: "01603".to_string(),
            time_on_job_years: "8".to_string(),
            time_on_job_months: "0".to_string(),
            has_co_buyer: "false".to_string(),
            vehicle_year: "2021".to_string(),
            vehicle_make: "Ford".to_string(),
            vehicle_model: "Mustang".to_string(),
            vehicle_vin: "1fa6p8th5m5100001".to_string(),
            vehicle_mileage: "24000".to_string(),
            vehicle_price: Some(String::new()),
            acknowledgment_consent: "true".to_string(),
            credit_check_consent: "true".to_string(),
            ..Default::default()
        }
    }

    fn fields(form: &FinancingForm) -> Vec<String> {
        match form.cleaned().check(today()) {
            Ok(()) => vec![],
            Err(errors) => {
                let mut fields: Vec<String> =
                    errors.errors().keys().map(|field| field.to_string()).collect();
                fields.sort();
                fields
            }
        }
    }

    #[test]
    fn complete_application_passes() {
        assert!(fields(&application()).is_empty());
    }

    #[test]
    fn minors_are_rejected() {
        let form = FinancingForm {
            applicant_dob: "2007-06-02".to_string(),
            ..application()
        };
        assert_eq!(fields(&form), vec!["applicant_dob"]);

        let form = FinancingForm {
            applicant_dob: "2007-06-01".to_string(),
            ..application()
        };
        assert!(fields(&form).is_empty());
    }

    #[test]
    fn numeric_ranges_are_enforced() {
        let form = FinancingForm {
            time_at_residence_months: "12".to_string(),
            rent_mortgage: "-5".to_string(),
            monthly_income: "999".to_string(),
            vehicle_year: "2027".to_string(),
            vehicle_price: Some("500".to_string()),
            ..application()
        };
        assert_eq!(
            fields(&form),
            vec![
                "monthly_income",
                "rent_mortgage",
                "time_at_residence_months",
                "vehicle_price",
                "vehicle_year"
            ]
        );
    }

    #[test]
    fn vin_excludes_ambiguous_letters() {
        let form = FinancingForm {
            vehicle_vin: "1FA6P8TH5M51000O1".to_string(),
            ..application()
        };
        assert_eq!(fields(&form), vec!["vehicle_vin"]);
    }

    #[test]
    fn consents_must_be_true() {
        let form = FinancingForm {
            credit_check_consent: "on".to_string(),
            ..application()
        };
        assert_eq!(fields(&form), vec!["credit_check_consent"]);
    }

    #[test]
    fn co_buyer_is_checked_only_when_present() {
        let form = FinancingForm {
            has_co_buyer: "true".to_string(),
            ..application()
        };
        let missing = fields(&form);
        assert!(missing.iter().all(|field| field.starts_with("co_buyer_")));
        assert!(missing.contains(&"co_buyer_ssn".to_string()));
        assert!(missing.contains(&"co_buyer_first_name".to_string()));

        let form = FinancingForm {
            has_co_buyer: "true".to_string(),
            co_buyer: co_buyer(),
            ..application()
        };
        assert!(fields(&form).is_empty());
    }

    #[test]
    fn form_fields_keep_their_wire_names() {
        let form: FinancingForm = serde_json::from_value(serde_json::json!({
            "applicantSSN": "123-45-6789",
            "applicantDOB": "1985-07-20",
            "coBuyerSSN": "987-65-4321",
            "applicantAddress1": "45 Oak Avenue",
        }))
        .expect("Failed to deserialize");
        assert_eq!(form.applicant_ssn, "123-45-6789");
        assert_eq!(form.applicant_address1, "45 Oak Avenue");
        assert_eq!(form.co_buyer.co_buyer_ssn, "987-65-4321");
    }

    #[test]
    fn ssn_is_masked() {
        assert_eq!(mask_ssn("123-45-6789"), "***-**-6789");
        assert_eq!(mask_ssn(""), "***-**-");
    }

    #[tokio::test]
    async fn submission_is_stored_and_announced() {
        let db = Database::InMemory(Box::default());
        let mailer = MemoryMailer::default();
        let receipt = submit_financing(&db, &mailer, &mail_settings(), application(), now())
            .await
            .expect("Failed to submit");

        let reference = receipt.reference.expect("Missing reference");
        assert_eq!(reference.len(), 8);
        assert_eq!(reference, reference.to_uppercase());

        let stored = db.all_financing().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].applicant_email, "joao@buyer.test");
        assert_eq!(stored[0].vehicle, "2021 Ford Mustang");
        assert_eq!(stored[0].details["applicantState"], "MA");

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "New Financing Application - Joao Pereira");
        assert!(sent[0].html.contains(&reference));
        assert!(!sent[0].html.contains("123-45-6789"));
    }

    #[tokio::test]
    async fn second_application_within_a_day_conflicts() {
        let db = Database::InMemory(Box::default());
        let mailer = MemoryMailer::default();
        submit_financing(&db, &mailer, &mail_settings(), application(), now())
            .await
            .unwrap();
        let again = submit_financing(
            &db,
            &mailer,
            &mail_settings(),
            application(),
            now() + Duration::hours(23),
        )
        .await;
        assert!(matches!(again, Err(AppErrors::Conflict(_))));

        let later = submit_financing(
            &db,
            &mailer,
            &mail_settings(),
            application(),
            now() + Duration::hours(25),
        )
        .await;
        assert!(later.is_ok());
    }

    #[tokio::test]
    async fn concurrent_duplicates_store_one_application() {
        let db = Database::InMemory(Box::default());
        let mailer = MemoryMailer::default();
        let settings = mail_settings();
        let (first, second) = tokio::join!(
            submit_financing(&db, &mailer, &settings, application(), now()),
            submit_financing(&db, &mailer, &settings, application(), now()),
        );
        let conflicts = [&first, &second]
            .iter()
            .filter(|result| matches!(result, Err(AppErrors::Conflict(_))))
            .count();
        assert_eq!(conflicts, 1);
        assert!(first.is_ok() || second.is_ok());
        assert_eq!(db.all_financing().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn staff_mail_escapes_applicant_text() {
        let db = Database::InMemory(Box::default());
        let mailer = MemoryMailer::default();
        let form = FinancingForm {
            additional_comments: Some("<img src=x onerror=alert(1)>".to_string()),
            ..application()
        };
        submit_financing(&db, &mailer, &mail_settings(), form, now())
            .await
            .expect("Failed to submit");
        let html = &mailer.sent()[0].html;
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img"));
    }

    #[tokio::test]
    async fn failed_notification_keeps_application() {
        let db = Database::InMemory(Box::default());
        let mailer = MemoryMailer::failing_for(&["sales@dealer.test"]);
        let receipt = submit_financing(&db, &mailer, &mail_settings(), application(), now()).await;
        assert!(receipt.is_ok());
        assert_eq!(db.all_financing().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_application_is_not_stored() {
        let db = Database::InMemory(Box::default());
        let mailer = MemoryMailer::default();
        let form = FinancingForm {
            applicant_ssn: "123456789".to_string(),
            ..application()
        };
        let result = submit_financing(&db, &mailer, &mail_settings(), form, now()).await;
        assert!(matches!(result, Err(AppErrors::Validation(_))));
        assert!(db.all_financing().await.unwrap().is_empty());
    }
}
