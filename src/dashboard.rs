use chrono::{NaiveDate, Weekday};

use crate::models::{
    AcademicSummary, AttendanceRecord, AttendanceStatus, DashboardStudent, DashboardSummary,
    FeeRecord, FeeStatus, FinancialSummary, MarksOverview, MarksRecord, NotificationRow,
    StudentProfile, TimetableRow,
};
use crate::summary;

pub const GOOD_ATTENDANCE_THRESHOLD: i64 = 75;
pub const RECENT_NOTIFICATION_LIMIT: usize = 5;

/// Rows the dashboard is built from, all fetched for one student.
#[derive(Debug, Clone, Copy)]
pub struct DashboardInputs<'a> {
    pub student: &'a StudentProfile,
    pub attendance: &'a [AttendanceRecord],
    pub marks: &'a [MarksRecord],
    pub fees: &'a [FeeRecord],
    pub notifications: &'a [NotificationRow],
    pub timetable: &'a [TimetableRow],
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn attendance_status(percentage: i64) -> &'static str {
    if percentage >= GOOD_ATTENDANCE_THRESHOLD {
        "Good"
    } else {
        "At Risk"
    }
}

/// Sum of `due` over every fee not marked Paid, with the earliest due date
/// among them.
pub fn pending_fees(fees: &[FeeRecord]) -> (f64, Option<NaiveDate>) {
    fees.iter()
        .filter(|fee| FeeStatus::parse(&fee.status) != Some(FeeStatus::Paid))
        .fold((0.0, None), |(amount, next_due), fee| {
            let next_due = match next_due {
                Some(date) if date <= fee.due_date => Some(date),
                _ => Some(fee.due_date),
            };
            (amount + fee.due, next_due)
        })
}

pub fn todays_schedule(
    timetable: &[TimetableRow],
    today: Weekday,
    branch: &str,
    section: &str,
) -> Vec<TimetableRow> {
    let day = day_name(today);
    let mut rows: Vec<TimetableRow> = timetable
        .iter()
        .filter(|row| row.day == day && row.branch == branch && row.section == section)
        .cloned()
        .collect();
    rows.sort_by_key(|row| row.period);
    rows
}

pub fn compose_dashboard(inputs: DashboardInputs<'_>, today: Weekday) -> DashboardSummary {
    let student = inputs.student;
    let percentage = summary::period_summary(inputs.attendance).percentage;

    let marks_total: f64 = inputs.marks.iter().map(|mark| mark.total_marks).sum();
    let (pending_amount, next_due) = pending_fees(inputs.fees);
    let has_pending = pending_amount > 0.0;

    DashboardSummary {
        student: DashboardStudent {
            name: student.name.clone(),
            hall_ticket_number: student.hall_ticket_number.clone(),
            branch: student.branch.clone(),
            section: student.section.clone(),
            year: student.year,
            semester: student.semester,
        },
        academic_summary: AcademicSummary {
            attendance: AttendanceStatus {
                percentage,
                status: attendance_status(percentage).to_string(),
            },
            marks: MarksOverview {
                average: summary::average_or_zero(marks_total, inputs.marks.len()),
                subjects: inputs.marks.len(),
            },
        },
        financial_summary: FinancialSummary {
            pending_fees: has_pending,
            amount: pending_amount,
            next_due_date: if has_pending { next_due } else { None },
        },
        recent_notifications: inputs
            .notifications
            .iter()
            .take(RECENT_NOTIFICATION_LIMIT)
            .cloned()
            .collect(),
        today_schedule: todays_schedule(
            inputs.timetable,
            today,
            &student.branch,
            &student.section,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> StudentProfile {
        StudentProfile {
            hall_ticket_number: "21A91A0501".to_string(),
            name: "Priya Sharma".to_string(),
            email: "priya.sharma@example.edu".to_string(),
            phone: "9876543210".to_string(),
            branch: "CSE".to_string(),
            section: "A".to_string(),
            year: 3,
            semester: 2,
        }
    }

    fn attendance(month: &str, subject: &str, total: i64, present: i64) -> AttendanceRecord {
        AttendanceRecord {
            student_id: "21A91A0501".to_string(),
            year: 2026,
            month: month.to_string(),
            subject: subject.to_string(),
            total_classes: total,
            present,
        }
    }

    fn fee(description: &str, due: f64, due_date: (i32, u32, u32), status: &str) -> FeeRecord {
        FeeRecord {
            student_id: "21A91A0501".to_string(),
            description: description.to_string(),
            amount: 10000.0,
            paid: 10000.0 - due,
            due,
            due_date: NaiveDate::from_ymd_opt(due_date.0, due_date.1, due_date.2).unwrap(),
            status: status.to_string(),
        }
    }

    fn slot(day: &str, period: i32, subject: &str, section: &str) -> TimetableRow {
        TimetableRow {
            day: day.to_string(),
            period,
            subject: subject.to_string(),
            faculty: "Dr. Rao".to_string(),
            branch: "CSE".to_string(),
            section: section.to_string(),
        }
    }

    fn notification(id: i64) -> NotificationRow {
        NotificationRow {
            id,
            message: format!("Notice {id}"),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            category: "Academic".to_string(),
        }
    }

    #[test]
    fn status_flips_at_threshold() {
        assert_eq!(attendance_status(75), "Good");
        assert_eq!(attendance_status(100), "Good");
        assert_eq!(attendance_status(74), "At Risk");
        assert_eq!(attendance_status(0), "At Risk");
    }

    #[test]
    fn pending_fees_skip_paid_rows_and_pick_earliest_due_date() {
        let fees = vec![
            fee("Tuition", 0.0, (2026, 1, 15), "Paid"),
            fee("Hostel", 3000.0, (2026, 4, 30), "Pending"),
            fee("Transport", 1500.0, (2026, 3, 10), "Partial"),
            fee("Library", 200.0, (2026, 2, 28), "Waived"),
        ];
        let (amount, next_due) = pending_fees(&fees);
        assert_eq!(amount, 4700.0);
        assert_eq!(next_due, NaiveDate::from_ymd_opt(2026, 2, 28));
    }

    #[test]
    fn schedule_filters_by_day_branch_and_section() {
        let timetable = vec![
            slot("Monday", 3, "DBMS", "A"),
            slot("Monday", 1, "OS", "A"),
            slot("Monday", 2, "CN", "B"),
            slot("Tuesday", 1, "Maths", "A"),
        ];
        let rows = todays_schedule(&timetable, Weekday::Mon, "CSE", "A");
        let subjects: Vec<&str> = rows.iter().map(|r| r.subject.as_str()).collect();
        assert_eq!(subjects, vec!["OS", "DBMS"]);

        assert!(todays_schedule(&timetable, Weekday::Sun, "CSE", "A").is_empty());
    }

    #[test]
    fn dashboard_rolls_up_every_section() {
        let student = student();
        let attendance = vec![
            attendance("Jan", "OS", 10, 7),
            attendance("Jan", "DBMS", 10, 8),
        ];
        let marks = vec![
            MarksRecord {
                student_id: "21A91A0501".to_string(),
                subject: "OS".to_string(),
                total_marks: 81.0,
            },
            MarksRecord {
                student_id: "21A91A0501".to_string(),
                subject: "DBMS".to_string(),
                total_marks: 74.0,
            },
        ];
        let fees = vec![fee("Hostel", 2500.0, (2026, 5, 1), "Pending")];
        let notifications: Vec<NotificationRow> = (1..=8).map(notification).collect();
        let timetable = vec![slot("Wednesday", 1, "OS", "A")];

        let dashboard = compose_dashboard(
            DashboardInputs {
                student: &student,
                attendance: &attendance,
                marks: &marks,
                fees: &fees,
                notifications: &notifications,
                timetable: &timetable,
            },
            Weekday::Wed,
        );

        assert_eq!(dashboard.student.hall_ticket_number, "21A91A0501");
        assert_eq!(dashboard.academic_summary.attendance.percentage, 75);
        assert_eq!(dashboard.academic_summary.attendance.status, "Good");
        assert_eq!(dashboard.academic_summary.marks.average, "77.50");
        assert_eq!(dashboard.academic_summary.marks.subjects, 2);
        assert!(dashboard.financial_summary.pending_fees);
        assert_eq!(dashboard.financial_summary.amount, 2500.0);
        assert_eq!(
            dashboard.financial_summary.next_due_date,
            NaiveDate::from_ymd_opt(2026, 5, 1)
        );
        assert_eq!(dashboard.recent_notifications.len(), RECENT_NOTIFICATION_LIMIT);
        assert_eq!(dashboard.recent_notifications[0].id, 1);
        assert_eq!(dashboard.today_schedule.len(), 1);

        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["student"]["hallTicketNumber"], "21A91A0501");
        assert_eq!(json["financialSummary"]["nextDueDate"], "2026-05-01");
        assert!(json["academicSummary"]["attendance"]["status"].is_string());
        assert!(json["todaySchedule"].is_array());
    }

    #[test]
    fn dashboard_without_records_uses_zero_defaults() {
        let student = student();
        let dashboard = compose_dashboard(
            DashboardInputs {
                student: &student,
                attendance: &[],
                marks: &[],
                fees: &[fee("Tuition", 0.0, (2026, 1, 1), "Paid")],
                notifications: &[],
                timetable: &[],
            },
            Weekday::Fri,
        );

        assert_eq!(dashboard.academic_summary.attendance.percentage, 0);
        assert_eq!(dashboard.academic_summary.attendance.status, "At Risk");
        assert_eq!(dashboard.academic_summary.marks.average, "0.00");
        assert_eq!(dashboard.academic_summary.marks.subjects, 0);
        assert!(!dashboard.financial_summary.pending_fees);
        assert_eq!(dashboard.financial_summary.next_due_date, None);
        assert!(dashboard.recent_notifications.is_empty());
    }
}
