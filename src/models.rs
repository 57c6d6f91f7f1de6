use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub year: i32,
    pub month: String,
    pub subject: String,
    pub total_classes: i64,
    pub present: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MarksRecord {
    pub student_id: String,
    pub subject: String,
    pub total_marks: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeeRecord {
    pub student_id: String,
    pub description: String,
    pub amount: f64,
    pub paid: f64,
    pub due: f64,
    pub due_date: NaiveDate,
    pub status: String,
}

/// Known fee states. Rows carry the raw string so unknown values survive
/// the round trip to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeStatus {
    Paid,
    Pending,
    Partial,
}

impl FeeStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Paid" => Some(Self::Paid),
            "Pending" => Some(Self::Pending),
            "Partial" => Some(Self::Partial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "Paid",
            Self::Pending => "Pending",
            Self::Partial => "Partial",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimetableRow {
    pub day: String,
    pub period: i32,
    pub subject: String,
    pub faculty: String,
    pub branch: String,
    pub section: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub message: String,
    pub date: NaiveDate,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StudentProfile {
    #[sqlx(rename = "hallticketnumber")]
    #[serde(rename = "hallticketnumber")]
    pub hall_ticket_number: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub branch: String,
    pub section: String,
    pub year: i32,
    pub semester: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ParentInfo {
    pub student_id: String,
    pub father_name: String,
    pub mother_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub branch: String,
    #[sqlx(rename = "hallticketnumber")]
    #[serde(rename = "hallticketnumber")]
    pub hall_ticket_number: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub branch: String,
    pub hall_ticket_number: String,
    pub password: String,
}

/// Attendance totals for one window: the whole record, a month, or a subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub total: i64,
    pub present: i64,
    pub absent: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectBreakdown {
    pub subject: String,
    #[serde(flatten)]
    pub period: PeriodSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub month: String,
    #[serde(flatten)]
    pub period: PeriodSummary,
    pub subjects: Vec<SubjectBreakdown>,
}

pub type SubjectSummary = SubjectBreakdown;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceReport {
    pub overall: PeriodSummary,
    pub monthly: Vec<MonthlySummary>,
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectMark {
    pub subject: String,
    pub marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarksSummary {
    pub total_subjects: usize,
    pub average_marks: String,
    pub highest_marks: SubjectMark,
    pub lowest_marks: SubjectMark,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarksReport {
    pub subjects: Vec<MarksRecord>,
    pub summary: MarksSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeesSummary {
    pub total_amount: f64,
    pub total_paid: f64,
    pub total_due: f64,
    pub paid_items: usize,
    pub pending_items: usize,
    pub partial_items: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeesReport {
    pub fees: Vec<FeeRecord>,
    pub summary: FeesSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStudent {
    pub name: String,
    pub hall_ticket_number: String,
    pub branch: String,
    pub section: String,
    pub year: i32,
    pub semester: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceStatus {
    pub percentage: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarksOverview {
    pub average: String,
    pub subjects: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcademicSummary {
    pub attendance: AttendanceStatus,
    pub marks: MarksOverview,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub pending_fees: bool,
    pub amount: f64,
    pub next_due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub student: DashboardStudent,
    pub academic_summary: AcademicSummary,
    pub financial_summary: FinancialSummary,
    pub recent_notifications: Vec<NotificationRow>,
    pub today_schedule: Vec<TimetableRow>,
}
