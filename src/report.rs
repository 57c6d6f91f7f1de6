use std::fmt::Write;

use crate::dashboard;
use crate::models::{AttendanceRecord, FeeRecord, MarksRecord, StudentProfile};
use crate::summary;

pub fn build_report(
    student: &StudentProfile,
    attendance: &[AttendanceRecord],
    marks: &[MarksRecord],
    fees: &[FeeRecord],
) -> String {
    let attendance = summary::summarize_attendance(attendance);

    let mut output = String::new();

    let _ = writeln!(output, "# Academic Report");
    let _ = writeln!(
        output,
        "{} ({}), {} section {}, year {} semester {}",
        student.name,
        student.hall_ticket_number,
        student.branch,
        student.section,
        student.year,
        student.semester
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance");

    if attendance.monthly.is_empty() {
        let _ = writeln!(output, "No attendance recorded.");
    } else {
        let overall = attendance.overall;
        let _ = writeln!(
            output,
            "Overall {}% ({} of {} classes, {} absent): {}",
            overall.percentage,
            overall.present,
            overall.total,
            overall.absent,
            dashboard::attendance_status(overall.percentage)
        );
        let _ = writeln!(output);
        for month in attendance.monthly.iter() {
            let _ = writeln!(
                output,
                "- {}: {}% ({} of {})",
                month.month, month.period.percentage, month.period.present, month.period.total
            );
        }
        let _ = writeln!(output);
        for subject in attendance.subjects.iter() {
            let _ = writeln!(
                output,
                "- {}: {}% ({} of {})",
                subject.subject,
                subject.period.percentage,
                subject.period.present,
                subject.period.total
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Marks");

    match summary::summarize_marks(marks) {
        Ok(report) => {
            let summary = &report.summary;
            let _ = writeln!(
                output,
                "Average {} across {} subjects (highest {} {}, lowest {} {})",
                summary.average_marks,
                summary.total_subjects,
                summary.highest_marks.subject,
                summary.highest_marks.marks,
                summary.lowest_marks.subject,
                summary.lowest_marks.marks
            );
            let _ = writeln!(output);
            for row in report.subjects.iter() {
                let _ = writeln!(output, "- {}: {}", row.subject, row.total_marks);
            }
        }
        Err(e) => {
            let _ = writeln!(output, "{e}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Fees");

    match summary::summarize_fees(fees) {
        Ok(report) => {
            let summary = &report.summary;
            let _ = writeln!(
                output,
                "Total {:.2}, paid {:.2}, due {:.2} ({} paid, {} pending, {} partial)",
                summary.total_amount,
                summary.total_paid,
                summary.total_due,
                summary.paid_items,
                summary.pending_items,
                summary.partial_items
            );
            let (pending, next_due) = dashboard::pending_fees(fees);
            if let Some(date) = next_due.filter(|_| pending > 0.0) {
                let _ = writeln!(output, "Next payment due {}.", date);
            }
        }
        Err(e) => {
            let _ = writeln!(output, "{e}");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

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

    #[test]
    fn report_lists_each_section() {
        let attendance = vec![
            AttendanceRecord {
                student_id: "21A91A0501".to_string(),
                year: 2026,
                month: "Jan".to_string(),
                subject: "DBMS".to_string(),
                total_classes: 20,
                present: 14,
            },
            AttendanceRecord {
                student_id: "21A91A0501".to_string(),
                year: 2026,
                month: "Feb".to_string(),
                subject: "DBMS".to_string(),
                total_classes: 10,
                present: 9,
            },
        ];
        let marks = vec![MarksRecord {
            student_id: "21A91A0501".to_string(),
            subject: "DBMS".to_string(),
            total_marks: 67.5,
        }];
        let fees = vec![FeeRecord {
            student_id: "21A91A0501".to_string(),
            description: "Hostel".to_string(),
            amount: 42000.0,
            paid: 20000.0,
            due: 22000.0,
            due_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            status: "Partial".to_string(),
        }];

        let report = build_report(&student(), &attendance, &marks, &fees);
        assert!(report.starts_with("# Academic Report"));
        assert!(report.contains("Priya Sharma (21A91A0501)"));
        assert!(report.contains("Overall 77% (23 of 30 classes, 7 absent): Good"));
        assert!(report.contains("- Jan: 70% (14 of 20)"));
        assert!(report.contains("- Feb: 90% (9 of 10)"));
        assert!(report.contains("Average 67.50 across 1 subjects"));
        assert!(report.contains("(0 paid, 0 pending, 1 partial)"));
        assert!(report.contains("Next payment due 2026-03-31."));
    }

    #[test]
    fn report_handles_missing_records() {
        let report = build_report(&student(), &[], &[], &[]);
        assert!(report.contains("No attendance recorded."));
        assert!(report.contains("No marks data found for this student."));
        assert!(report.contains("No fees data found for this student."));
    }
}
