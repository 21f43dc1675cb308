use crate::configuration::MailSettings;
use crate::data_models::Receipt;
use crate::db::ExternalText;
use crate::errors::AppErrors;
use crate::leads::{is_blank, is_checked, staff_recipient, FieldChecks, PHONE};
use crate::mailer::{Email, Mailer};
use crate::templates::{ConfirmationMail, MailRow, ModalMessageMail, StaffLeadMail};
use askama::Template;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

pub const CONTACT_TYPES: [&str; 3] = ["inquiry", "test-drive", "message"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactForm {
    #[validate(length(min = 2, max = 50, message = "First name must be between 2 and 50 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50, message = "Last name must be between 2 and 50 characters"))]
    pub last_name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub drivers_license: Option<String>,
    pub preferred_contact: Option<String>,
    #[validate(length(min = 10, max = 1000, message = "Message must be between 10 and 1000 characters"))]
    pub message: String,
    pub contact_type: String,
    pub vehicle_info: Option<String>,
    pub communication_consent: Option<String>,
    pub data_consent: String,
    pub accuracy_consent: String,
    pub test_drive_consent: Option<String>,
}

impl ExternalText for ContactForm {
    fn cleaned(&self) -> Self {
        Self {
            first_name: self.clean(&self.first_name),
            last_name: self.clean(&self.last_name),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            address: self.clean_optional(&self.address),
            city: self.clean_optional(&self.city),
            state: self.clean_optional(&self.state),
            zip_code: self.clean_optional(&self.zip_code),
            drivers_license: self.clean_optional(&self.drivers_license),
            preferred_contact: self.clean_optional(&self.preferred_contact),
            message: self.message.trim().to_string(),
            contact_type: self.contact_type.trim().to_string(),
            vehicle_info: self.clean_optional(&self.vehicle_info),
            communication_consent: self.clean_optional(&self.communication_consent),
            data_consent: self.data_consent.trim().to_string(),
            accuracy_consent: self.accuracy_consent.trim().to_string(),
            test_drive_consent: self.clean_optional(&self.test_drive_consent),
        }
    }
}

impl ContactForm {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut checks = FieldChecks::start(self.validate());
        checks.require(
            PHONE.is_match(&self.phone),
            "phone",
            "Phone must be in format (XXX) XXX-XXXX",
        );
        checks.require(
            CONTACT_TYPES.contains(&self.contact_type.as_str()),
            "contact_type",
            "Invalid contact type",
        );
        checks.require(
            is_checked(&self.data_consent),
            "data_consent",
            "Data usage consent is required",
        );
        checks.require(
            is_checked(&self.accuracy_consent),
            "accuracy_consent",
            "Information accuracy consent is required",
        );
        if self.is_test_drive() {
            checks.require(
                !is_blank(self.drivers_license.as_deref().unwrap_or_default()),
                "drivers_license",
                "Driver's license is required for test drives",
            );
            checks.require(
                is_checked(self.test_drive_consent.as_deref().unwrap_or_default()),
                "test_drive_consent",
                "Test drive agreement is required for test drives",
            );
        }
        checks.finish()
    }

    fn is_test_drive(&self) -> bool {
        self.contact_type == "test-drive"
    }

    fn vehicle(&self) -> &str {
        self.vehicle_info.as_deref().unwrap_or("General inquiry")
    }

    pub fn subject(&self) -> String {
        match self.contact_type.as_str() {
            "test-drive" => format!("Test Drive Request - {}", self.vehicle()),
            "inquiry" => format!("Vehicle Inquiry - {}", self.vehicle()),
            "message" => format!("Customer Message - {}", self.vehicle()),
            _ => "Contact Form Submission".to_string(),
        }
    }

    pub fn type_text(&self) -> &'static str {
        match self.contact_type.as_str() {
            "test-drive" => "test drive request",
            "inquiry" => "inquiry",
            "message" => "message",
            _ => "contact",
        }
    }

    fn staff_html(&self) -> Result<String, askama::Error> {
        let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        let mut rows = vec![
            MailRow::new("Name", format!("{} {}", self.first_name, self.last_name)),
            MailRow::new("Email", self.email.as_str()),
            MailRow::new("Phone", self.phone.as_str()),
            MailRow::new("Address", optional(&self.address)),
            MailRow::new("City", optional(&self.city)),
            MailRow::new("State", optional(&self.state)),
            MailRow::new("ZIP", optional(&self.zip_code)),
            MailRow::new("Preferred contact", optional(&self.preferred_contact)),
            MailRow::new("Vehicle", self.vehicle()),
            MailRow::new("Request", self.type_text()),
        ];
        if self.is_test_drive() {
            rows.push(MailRow::new("Driver's license", optional(&self.drivers_license)));
        }
        rows.push(MailRow::new("Message", self.message.as_str()));
        rows.push(MailRow::new(
            "Marketing consent",
            if self.communication_consent.is_some() { "yes" } else { "no" },
        ));
        let subject = self.subject();
        StaffLeadMail {
            subject: &subject,
            rows,
        }
        .render()
    }

    fn confirmation_html(&self) -> Result<String, askama::Error> {
        ConfirmationMail {
            first_name: &self.first_name,
            request: self.type_text(),
            vehicle: self.vehicle(),
        }
        .render()
    }
}

/// Emails the lead to staff, then a confirmation to the customer. Only the
/// staff email has to succeed.
pub async fn submit_contact(
    mailer: &dyn Mailer,
    settings: &MailSettings,
    form: ContactForm,
) -> Result<Receipt, AppErrors> {
    let form = form.cleaned();
    form.check()?;
    let recipient = staff_recipient(settings)?;

    mailer
        .send(Email::new(recipient, form.subject(), form.staff_html()?).reply_to(&form.email))
        .await?;

    let confirmation = Email::new(
        &form.email,
        format!("Confirmation: Your {}", form.type_text()),
        form.confirmation_html()?,
    );
    if let Err(err) = mailer.send(confirmation).await {
        warn!("confirmation email to {} failed: {err}", form.email);
    }

    info!(
        "contact form: {} from {} {} ({}) regarding {}",
        form.contact_type,
        form.first_name,
        form.last_name,
        form.email,
        form.vehicle()
    );
    Ok(Receipt::new(format!(
        "Thank you {}! Your {} has been sent successfully. We'll contact you within 24 hours.",
        form.first_name,
        form.type_text()
    )))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModalMessage {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl ExternalText for ModalMessage {
    fn cleaned(&self) -> Self {
        Self {
            name: self.clean(&self.name),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }
}

pub async fn send_message(
    mailer: &dyn Mailer,
    settings: &MailSettings,
    message: ModalMessage,
) -> Result<Receipt, AppErrors> {
    let message = message.cleaned();
    if [&message.name, &message.email, &message.phone, &message.message]
        .iter()
        .any(|field| field.is_empty())
    {
        return Err(AppErrors::BadRequest(
            "All fields (Name, Email, Phone, Message) are required.".to_string(),
        ));
    }
    let recipient = staff_recipient(settings)?;
    let html = ModalMessageMail {
        rows: vec![
            MailRow::new("Name", message.name.as_str()),
            MailRow::new("Email", message.email.as_str()),
            MailRow::new("Phone", message.phone.as_str()),
            MailRow::new("Message", message.message.as_str()),
        ],
    }
    .render()?;
    mailer
        .send(
            Email::new(
                recipient,
                format!("New Message from Home Page Modal by {}", message.name),
                html,
            )
            .reply_to(&message.email),
        )
        .await?;
    info!("modal message sent from {} to {recipient}", message.email);
    Ok(Receipt::new("Message sent").with_redirect("/message-sent"))
}
