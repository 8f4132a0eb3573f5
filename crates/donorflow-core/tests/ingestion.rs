use anyhow::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use donorflow_core::error::IngestError;
use donorflow_core::ingestion::{ingest_csv, MAX_REPORTED_ERRORS};
use donorflow_core::store::{DonorStore, MemoryDonorStore};
use donorflow_core::types::PaymentMethod;

const HEADER: &str =
    "full_name,email,phone,address,donation_amount,donation_date,payment_method,notes";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn csv(rows: &[&str]) -> String {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn repeat_donations_merge_into_one_donor() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = csv(&[
        "Asha K,asha@x.com,+911234567890,\"12 Park Rd, City, State 400001\",500.00,2024-01-10,UPI,",
        "Asha K,asha@x.com,+911234567890,\"12 Park Rd, City, State 400001\",300.00,2024-02-10,Cash,",
    ]);

    let report = ingest_csv(&store, &content, now()).await?;
    assert_eq!(report.total_records, 2);
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 0);
    assert_eq!(report.created, 1);
    assert_eq!(report.merged, 1);

    let donor = store
        .find_by_email("asha@x.com")
        .await?
        .expect("donor created");
    assert_eq!(store.len().await, 1);
    assert_eq!(donor.total_donated, 800.0);
    assert_eq!(donor.donation_history.len(), 2);
    assert_eq!(donor.last_donated, date(2024, 2, 10));
    assert_eq!(donor.payment_method, PaymentMethod::Cash);
    assert_eq!(donor.donation_amount, 300.0);

    Ok(())
}

#[tokio::test]
async fn out_of_order_rows_keep_latest_last_donated() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = csv(&[
        "Asha K,asha@x.com,+911234567890,12 Park Road City,500,2024-03-01,UPI,",
        "Asha K,asha@x.com,+911234567890,12 Park Road City,100,2024-01-01,Cash,late entry",
    ]);

    ingest_csv(&store, &content, now()).await?;
    let donor = store.find_by_email("asha@x.com").await?.expect("donor");

    assert_eq!(donor.last_donated, date(2024, 3, 1));
    assert_eq!(donor.donation_date, date(2024, 1, 1));
    assert_eq!(donor.notes, "late entry");

    Ok(())
}

#[tokio::test]
async fn emails_are_matched_case_insensitively() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = csv(&[
        "Ravi Menon,Ravi@Example.org,+919812345678,44 Lake View Kochi,10,2024-01-01,Cash,",
        "Ravi Menon,ravi@example.org,+919812345678,44 Lake View Kochi,15,2024-01-02,Cash,",
    ]);

    let report = ingest_csv(&store, &content, now()).await?;
    assert_eq!(report.merged, 1);
    assert_eq!(store.len().await, 1);

    Ok(())
}

#[tokio::test]
async fn invalid_amounts_fail_only_their_rows() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = csv(&[
        "Zero Donor,zero@example.org,+919800000001,1 First Street Pune,0,2024-01-01,Cash,",
        "Good Donor,good@example.org,+919800000002,2 Second Street Pune,250,2024-01-01,Cash,",
        "Negative Donor,neg@example.org,+919800000003,3 Third Street Pune,-5,2024-01-01,Cash,",
        "Text Donor,text@example.org,+919800000004,4 Fourth Street Pune,lots,2024-01-01,Cash,",
    ]);

    let report = ingest_csv(&store, &content, now()).await?;
    assert_eq!(report.success_count, 1);
    assert_eq!(report.failure_count, 3);
    assert_eq!(report.success_count + report.failure_count, report.total_records);

    let failed_rows: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
    assert_eq!(failed_rows, vec![1, 3, 4]);
    assert_eq!(report.errors[0].error, "Row 1: Invalid donation_amount");
    assert!(store.find_by_email("good@example.org").await?.is_some());

    Ok(())
}

#[tokio::test]
async fn all_row_messages_are_joined() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = csv(&[",not-an-email,,,abc,someday,,"]);

    let report = ingest_csv(&store, &content, now()).await?;
    assert_eq!(report.failure_count, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors[0].error,
        "Row 1: Missing full_name; Row 1: Invalid email; Row 1: Missing phone; \
         Row 1: Missing address; Row 1: Invalid donation_amount; \
         Row 1: Invalid donation_date; Row 1: Missing payment_method"
    );

    Ok(())
}

#[tokio::test]
async fn persistence_constraints_fail_per_row() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = csv(&[
        "Future Donor,future@example.org,+919800000010,10 Future Lane Delhi,100,2024-06-02,Cash,",
        "Today Donor,today@example.org,+919800000011,11 Present Lane Delhi,100,2024-06-01,Cash,",
        "Crypto Donor,crypto@example.org,+919800000012,12 Chain Lane Delhi,100,2024-01-01,Bitcoin,",
    ]);

    let report = ingest_csv(&store, &content, now()).await?;
    assert_eq!(report.success_count, 1);
    assert_eq!(report.failure_count, 2);
    assert_eq!(
        report.errors[0].error,
        "Row 1: Donation date cannot be in the future"
    );
    assert_eq!(
        report.errors[1].error,
        "Row 3: Please select a valid payment method"
    );
    assert!(store.find_by_email("future@example.org").await?.is_none());
    assert!(store.find_by_email("today@example.org").await?.is_some());

    Ok(())
}

#[tokio::test]
async fn error_list_is_truncated_but_counted() -> Result<()> {
    let store = MemoryDonorStore::new();
    let bad_rows: Vec<String> = (0..14)
        .map(|i| format!("Donor {i},bad-email-{i},+91980000{i:04},Some Street Pune,10,2024-01-01,Cash,"))
        .collect();
    let rows: Vec<&str> = bad_rows.iter().map(String::as_str).collect();

    let report = ingest_csv(&store, &csv(&rows), now()).await?;
    assert_eq!(report.failure_count, 14);
    assert_eq!(report.total_errors, 14);
    assert_eq!(report.errors.len(), MAX_REPORTED_ERRORS);
    assert!(store.is_empty().await);

    Ok(())
}

#[tokio::test]
async fn missing_columns_abort_before_any_write() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = "full_name,email,address,donation_amount\n\
                   Asha K,asha@x.com,12 Park Rd City,500\n";

    let err = ingest_csv(&store, content, now()).await.unwrap_err();
    match err {
        IngestError::Schema(schema) => {
            assert_eq!(
                schema.missing,
                vec!["phone", "donation_date", "payment_method"]
            );
            assert_eq!(schema.found.len(), 4);
        }
        other => panic!("expected schema error, got {other:?}"),
    }
    assert!(store.is_empty().await);

    Ok(())
}

#[tokio::test]
async fn header_only_file_is_rejected() -> Result<()> {
    let store = MemoryDonorStore::new();
    let err = ingest_csv(&store, &format!("{HEADER}\n\n"), now())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::NoData));
    assert_eq!(err.to_string(), "No valid data found in CSV file");

    Ok(())
}

#[tokio::test]
async fn ragged_rows_are_parse_errors() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = csv(&["Asha K,asha@x.com,+911234567890"]);

    let err = ingest_csv(&store, &content, now()).await.unwrap_err();
    let IngestError::Parse(parse) = err else {
        panic!("expected parse error");
    };
    assert!(parse.messages()[0].contains("Too few fields"));
    assert!(store.is_empty().await);

    Ok(())
}

#[tokio::test]
async fn headers_are_normalized() -> Result<()> {
    let store = MemoryDonorStore::new();
    let content = "Full Name, Email ,PHONE,Address,Donation Amount,Donation  Date,Payment Method\n\
                   Meera Iyer,meera@example.org,+919876543210,7 Temple Street Madurai,1200,2024-04-14,Bank Transfer\n";

    let report = ingest_csv(&store, content, now()).await?;
    assert_eq!(report.success_count, 1);
    let donor = store.find_by_email("meera@example.org").await?.expect("donor");
    assert_eq!(donor.notes, "");

    Ok(())
}
