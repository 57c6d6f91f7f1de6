use std::io::Read;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::models::{
    AttendanceRecord, FeeRecord, FeeStatus, MarksRecord, NewUser, NotificationRow, ParentInfo,
    StudentProfile, TimetableRow, User,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportKind {
    Attendance,
    Marks,
    Fees,
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        ("21A91A0501", "Priya Sharma", "priya.sharma@example.edu", "9876543210", "CSE", "A", 3, 2),
        ("21A91A0502", "Arjun Reddy", "arjun.reddy@example.edu", "9876501234", "CSE", "A", 3, 2),
        ("21A91A0433", "Meera Iyer", "meera.iyer@example.edu", "9123456780", "ECE", "B", 3, 2),
    ];

    for (hall_ticket, name, email, phone, branch, section, year, semester) in students {
        sqlx::query(
            r#"
            INSERT INTO student_records.students
            (hallticketnumber, name, email, phone, branch, section, year, semester)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (hallticketnumber) DO UPDATE
            SET name = EXCLUDED.name, branch = EXCLUDED.branch, section = EXCLUDED.section,
                year = EXCLUDED.year, semester = EXCLUDED.semester
            "#,
        )
        .bind(hall_ticket)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(branch)
        .bind(section)
        .bind(year)
        .bind(semester)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO student_records.parents
        (student_id, father_name, mother_name, phone, email, address)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id) DO NOTHING
        "#,
    )
    .bind("21A91A0501")
    .bind("Rajesh Sharma")
    .bind("Sunita Sharma")
    .bind("9811122233")
    .bind("rajesh.sharma@example.com")
    .bind("12 MG Road, Hyderabad")
    .execute(pool)
    .await?;

    let attendance = vec![
        ("Jan", "Operating Systems", 18, 15),
        ("Jan", "DBMS", 16, 11),
        ("Jan", "Computer Networks", 14, 12),
        ("Feb", "Operating Systems", 20, 17),
        ("Feb", "DBMS", 18, 12),
    ];
    for (month, subject, total_classes, present) in attendance {
        upsert_attendance(
            pool,
            &AttendanceRecord {
                student_id: "21A91A0501".to_string(),
                year: 2026,
                month: month.to_string(),
                subject: subject.to_string(),
                total_classes,
                present,
            },
        )
        .await?;
    }

    let marks = vec![
        ("Operating Systems", 84.0),
        ("DBMS", 67.5),
        ("Computer Networks", 91.0),
    ];
    for (subject, total_marks) in marks {
        upsert_marks(
            pool,
            &MarksRecord {
                student_id: "21A91A0501".to_string(),
                subject: subject.to_string(),
                total_marks,
            },
        )
        .await?;
    }

    let fees = vec![
        ("Tuition", 85000.0, 85000.0, (2026, 1, 15), FeeStatus::Paid),
        ("Hostel", 42000.0, 20000.0, (2026, 3, 31), FeeStatus::Partial),
        ("Exam", 2500.0, 0.0, (2026, 4, 20), FeeStatus::Pending),
    ];
    for (description, amount, paid, (y, m, d), status) in fees {
        upsert_fee(
            pool,
            &FeeRecord {
                student_id: "21A91A0501".to_string(),
                description: description.to_string(),
                amount,
                paid,
                due: amount - paid,
                due_date: NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?,
                status: status.as_str().to_string(),
            },
        )
        .await?;
    }

    let timetable = vec![
        ("Monday", 1, "Operating Systems", "Dr. K. Rao"),
        ("Monday", 2, "DBMS", "Prof. L. Menon"),
        ("Tuesday", 1, "Computer Networks", "Dr. S. Gupta"),
        ("Wednesday", 1, "DBMS", "Prof. L. Menon"),
        ("Thursday", 1, "Operating Systems", "Dr. K. Rao"),
        ("Friday", 1, "Computer Networks", "Dr. S. Gupta"),
    ];
    for (day, period, subject, faculty) in timetable {
        sqlx::query(
            r#"
            INSERT INTO student_records.timetable (day, period, subject, faculty, branch, section)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (day, period, branch, section) DO NOTHING
            "#,
        )
        .bind(day)
        .bind(period)
        .bind(subject)
        .bind(faculty)
        .bind("CSE")
        .bind("A")
        .execute(pool)
        .await?;
    }

    let existing: i64 = sqlx::query("SELECT COUNT(*) AS count FROM student_records.notifications")
        .fetch_one(pool)
        .await?
        .get("count");
    if existing == 0 {
        let notifications = vec![
            ("Mid-term examinations begin on 2 March.", "Exams", (2026, 2, 10)),
            ("Hostel fee second instalment is due by 31 March.", "Fees", (2026, 2, 12)),
            ("Guest lecture on distributed systems in Seminar Hall 2.", "Events", (2026, 2, 14)),
        ];
        for (message, category, (y, m, d)) in notifications {
            let date = NaiveDate::from_ymd_opt(y, m, d).context("invalid date")?;
            insert_notification(pool, message, category, date).await?;
        }
    }

    Ok(())
}

/// Deserializes every CSV record, reporting the line of the first bad one.
pub fn read_csv_rows<T, R>(source: R) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::Reader::from_reader(source);
    let mut rows = Vec::new();

    for (index, result) in reader.deserialize::<T>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV record {}", index + 1))?;
        rows.push(row);
    }

    Ok(rows)
}

pub fn validate_attendance(record: &AttendanceRecord) -> anyhow::Result<()> {
    if record.total_classes < 0 {
        bail!(
            "{} {} {}: total_classes must not be negative",
            record.student_id,
            record.month,
            record.subject
        );
    }
    if record.present < 0 || record.present > record.total_classes {
        bail!(
            "{} {} {}: present must be between 0 and total_classes",
            record.student_id,
            record.month,
            record.subject
        );
    }
    Ok(())
}

pub async fn import_csv(
    pool: &PgPool,
    kind: ImportKind,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    match kind {
        ImportKind::Attendance => {
            let rows: Vec<AttendanceRecord> = read_csv_rows(file)?;
            for row in &rows {
                validate_attendance(row)?;
            }
            for row in &rows {
                inserted += upsert_attendance(pool, row).await? as usize;
            }
        }
        ImportKind::Marks => {
            let rows: Vec<MarksRecord> = read_csv_rows(file)?;
            for row in &rows {
                inserted += upsert_marks(pool, row).await? as usize;
            }
        }
        ImportKind::Fees => {
            let rows: Vec<FeeRecord> = read_csv_rows(file)?;
            for row in &rows {
                inserted += upsert_fee(pool, row).await? as usize;
            }
        }
    }

    info!(?kind, inserted, path = %csv_path.display(), "csv import finished");
    Ok(inserted)
}

async fn upsert_attendance(pool: &PgPool, record: &AttendanceRecord) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO student_records.attendance
        (student_id, year, month, subject, total_classes, present)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, year, month, subject) DO UPDATE
        SET total_classes = EXCLUDED.total_classes, present = EXCLUDED.present
        "#,
    )
    .bind(&record.student_id)
    .bind(record.year)
    .bind(&record.month)
    .bind(&record.subject)
    .bind(record.total_classes)
    .bind(record.present)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

async fn upsert_marks(pool: &PgPool, record: &MarksRecord) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO student_records.marks (student_id, subject, total_marks)
        VALUES ($1, $2, $3)
        ON CONFLICT (student_id, subject) DO UPDATE
        SET total_marks = EXCLUDED.total_marks
        "#,
    )
    .bind(&record.student_id)
    .bind(&record.subject)
    .bind(record.total_marks)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

async fn upsert_fee(pool: &PgPool, record: &FeeRecord) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO student_records.fees
        (student_id, description, amount, paid, due, due_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (student_id, description) DO UPDATE
        SET amount = EXCLUDED.amount, paid = EXCLUDED.paid, due = EXCLUDED.due,
            due_date = EXCLUDED.due_date, status = EXCLUDED.status
        "#,
    )
    .bind(&record.student_id)
    .bind(&record.description)
    .bind(record.amount)
    .bind(record.paid)
    .bind(record.due)
    .bind(record.due_date)
    .bind(&record.status)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn fetch_attendance(
    pool: &PgPool,
    student_id: &str,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query_as::<_, AttendanceRecord>(
        "SELECT student_id, year, month, subject, total_classes, present \
         FROM student_records.attendance \
         WHERE student_id = $1 \
         ORDER BY year DESC, month DESC, subject",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    debug!(student_id, rows = rows.len(), "fetched attendance");
    Ok(rows)
}

pub async fn fetch_marks(pool: &PgPool, student_id: &str) -> anyhow::Result<Vec<MarksRecord>> {
    let rows = sqlx::query_as::<_, MarksRecord>(
        "SELECT student_id, subject, total_marks \
         FROM student_records.marks \
         WHERE student_id = $1 \
         ORDER BY subject",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    debug!(student_id, rows = rows.len(), "fetched marks");
    Ok(rows)
}

pub async fn fetch_fees(pool: &PgPool, student_id: &str) -> anyhow::Result<Vec<FeeRecord>> {
    let rows = sqlx::query_as::<_, FeeRecord>(
        "SELECT student_id, description, amount, paid, due, due_date, status \
         FROM student_records.fees \
         WHERE student_id = $1 \
         ORDER BY due_date DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    debug!(student_id, rows = rows.len(), "fetched fees");
    Ok(rows)
}

pub async fn fetch_timetable(
    pool: &PgPool,
    day: Option<&str>,
    branch: Option<&str>,
    section: Option<&str>,
) -> anyhow::Result<Vec<TimetableRow>> {
    let mut query = String::from(
        "SELECT day, period, subject, faculty, branch, section \
         FROM student_records.timetable \
         WHERE TRUE",
    );
    let mut binds = Vec::new();

    for (column, value) in [("day", day), ("branch", branch), ("section", section)] {
        if let Some(value) = value {
            binds.push(value);
            query.push_str(&format!(" AND {column} = ${}", binds.len()));
        }
    }
    query.push_str(" ORDER BY day, period");

    let mut rows = sqlx::query_as::<_, TimetableRow>(&query);
    for value in binds {
        rows = rows.bind(value);
    }

    Ok(rows.fetch_all(pool).await?)
}

pub async fn fetch_notifications(
    pool: &PgPool,
    limit: Option<i64>,
) -> anyhow::Result<Vec<NotificationRow>> {
    let rows = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, message, date, category \
         FROM student_records.notifications \
         ORDER BY date DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn insert_notification(
    pool: &PgPool,
    message: &str,
    category: &str,
    date: NaiveDate,
) -> anyhow::Result<i64> {
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO student_records.notifications (message, date, category)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(message)
    .bind(date)
    .bind(category)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

pub async fn fetch_student(
    pool: &PgPool,
    hall_ticket: &str,
) -> anyhow::Result<Option<StudentProfile>> {
    let student = sqlx::query_as::<_, StudentProfile>(
        "SELECT hallticketnumber, name, email, phone, branch, section, year, semester \
         FROM student_records.students \
         WHERE hallticketnumber = $1",
    )
    .bind(hall_ticket)
    .fetch_optional(pool)
    .await?;

    Ok(student)
}

pub async fn fetch_parent(pool: &PgPool, hall_ticket: &str) -> anyhow::Result<Option<ParentInfo>> {
    let parent = sqlx::query_as::<_, ParentInfo>(
        "SELECT student_id, father_name, mother_name, phone, email, address \
         FROM student_records.parents \
         WHERE student_id = $1",
    )
    .bind(hall_ticket)
    .fetch_optional(pool)
    .await?;

    Ok(parent)
}

pub async fn create_user(pool: &PgPool, user: &NewUser) -> anyhow::Result<i64> {
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO student_records.users
        (name, username, email, phone, branch, hallticketnumber, password)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#,
    )
    .bind(&user.name)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.branch)
    .bind(&user.hall_ticket_number)
    .bind(&user.password)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

/// Looks a user up by hall ticket, and by email too when one is given.
pub async fn find_user(
    pool: &PgPool,
    hall_ticket: &str,
    email: Option<&str>,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, username, email, phone, branch, hallticketnumber, password \
         FROM student_records.users \
         WHERE hallticketnumber = $1 AND ($2::TEXT IS NULL OR email = $2)",
    )
    .bind(hall_ticket)
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn update_password(
    pool: &PgPool,
    hall_ticket: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        "UPDATE student_records.users SET password = $1 \
         WHERE hallticketnumber = $2 AND email = $3",
    )
    .bind(password)
    .bind(hall_ticket)
    .bind(email)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
