use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::models::{
    AttendanceRecord, AttendanceReport, FeeRecord, FeeStatus, FeesReport, FeesSummary,
    MarksRecord, MarksReport, MarksSummary, MonthlySummary, PeriodSummary, SubjectBreakdown,
    SubjectMark,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SummaryError {
    /// The student has no rows of this kind; callers answer with not-found.
    #[error("No {0} data found for this student.")]
    NoData(&'static str),
}

/// Whole-number percentage of `present` over `total`, rounded half up.
/// A zero (or negative) total yields 0.
pub fn percentage_or_zero(present: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (present * 200 + total) / (total * 2)
}

/// Mean of `total` over `count` items with exactly two decimals, rounded
/// half up, "0.00" when there is nothing to average.
pub fn average_or_zero(total: f64, count: usize) -> String {
    if count == 0 {
        return "0.00".to_string();
    }
    let mean = total / count as f64;
    format!("{:.2}", (mean * 100.0).round() / 100.0)
}

pub fn period_summary<'a, I>(records: I) -> PeriodSummary
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let (total, present) = records
        .into_iter()
        .fold((0i64, 0i64), |(total, present), record| {
            (total + record.total_classes, present + record.present)
        });

    PeriodSummary {
        total,
        present,
        absent: total - present,
        percentage: percentage_or_zero(present, total),
    }
}

type Group<'a> = (&'a str, Vec<&'a AttendanceRecord>);

/// Groups rows by `key` in one pass, keeping keys in first-seen order.
fn group_first_seen<'a, F>(records: &'a [AttendanceRecord], key: F) -> Vec<Group<'a>>
where
    F: Fn(&'a AttendanceRecord) -> &'a str,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for record in records {
        let value = key(record);
        let slot = *index.entry(value).or_insert_with(|| {
            groups.push((value, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }

    groups
}

pub fn summarize_attendance(records: &[AttendanceRecord]) -> AttendanceReport {
    if records.is_empty() {
        return AttendanceReport::default();
    }

    let overall = period_summary(records);
    let months = group_first_seen(records, |record| record.month.as_str());
    let subjects = group_first_seen(records, |record| record.subject.as_str());

    let monthly: Vec<MonthlySummary> = months
        .iter()
        .map(|(month, rows)| MonthlySummary {
            month: month.to_string(),
            period: period_summary(rows.iter().copied()),
            subjects: subjects
                .iter()
                .map(|(subject, _)| {
                    let period = rows
                        .iter()
                        .find(|row| row.subject == *subject)
                        .map(|row| period_summary([*row]))
                        .unwrap_or_default();
                    SubjectBreakdown {
                        subject: subject.to_string(),
                        period,
                    }
                })
                .collect(),
        })
        .collect();

    let subjects: Vec<SubjectBreakdown> = subjects
        .iter()
        .map(|(subject, rows)| SubjectBreakdown {
            subject: subject.to_string(),
            period: period_summary(rows.iter().copied()),
        })
        .collect();

    AttendanceReport {
        overall,
        monthly,
        subjects,
    }
}

pub fn summarize_marks(records: &[MarksRecord]) -> Result<MarksReport, SummaryError> {
    let (first, rest) = records.split_first().ok_or(SummaryError::NoData("marks"))?;

    let mut highest = SubjectMark {
        subject: first.subject.clone(),
        marks: first.total_marks,
    };
    let mut lowest = highest.clone();
    let mut total = first.total_marks;

    for record in rest {
        total += record.total_marks;
        if record.total_marks > highest.marks {
            highest = SubjectMark {
                subject: record.subject.clone(),
                marks: record.total_marks,
            };
        }
        if record.total_marks < lowest.marks {
            lowest = SubjectMark {
                subject: record.subject.clone(),
                marks: record.total_marks,
            };
        }
    }

    Ok(MarksReport {
        subjects: records.to_vec(),
        summary: MarksSummary {
            total_subjects: records.len(),
            average_marks: average_or_zero(total, records.len()),
            highest_marks: highest,
            lowest_marks: lowest,
        },
    })
}

pub fn summarize_fees(records: &[FeeRecord]) -> Result<FeesReport, SummaryError> {
    if records.is_empty() {
        return Err(SummaryError::NoData("fees"));
    }

    let mut summary = FeesSummary::default();
    for fee in records {
        summary.total_amount += fee.amount;
        summary.total_paid += fee.paid;
        summary.total_due += fee.due;

        match FeeStatus::parse(&fee.status) {
            Some(FeeStatus::Paid) => summary.paid_items += 1,
            Some(FeeStatus::Pending) => summary.pending_items += 1,
            Some(FeeStatus::Partial) => summary.partial_items += 1,
            None => warn!(
                student_id = %fee.student_id,
                description = %fee.description,
                status = %fee.status,
                "fee row has an unrecognised status; left out of status counts"
            ),
        }
    }

    Ok(FeesReport {
        fees: records.to_vec(),
        summary,
    })
}
