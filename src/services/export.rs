//! Loan export rendering (CSV and PDF byte streams).
//!
//! The report layout is not a contract; both renderers emit the same
//! tabular fields the loan list endpoint serves.

use chrono::{DateTime, Utc};

use crate::models::loan::LoanDetails;

const CSV_HEADER: &str =
    "id,equipment,serial,borrower,phone,loan_date,expected_return,actual_return,status,cancel_reason";

/// Render the filtered loan set as CSV
pub fn loans_to_csv(loans: &[LoanDetails]) -> String {
    let mut out = String::with_capacity(64 * (loans.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for loan in loans {
        let fields = [
            loan.id.to_string(),
            loan.equipment_name.clone(),
            loan.equipment_serial.clone(),
            loan.borrower_name.clone(),
            loan.borrower_phone.clone(),
            format_date(Some(loan.loan_date)),
            format_date(Some(loan.expected_return_date)),
            format_date(loan.actual_return_date),
            loan.status.to_string(),
            loan.cancel_reason.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Render the filtered loan set as a single-font tabular PDF
pub fn loans_to_pdf(loans: &[LoanDetails]) -> Vec<u8> {
    let mut lines = Vec::with_capacity(loans.len() + 2);
    lines.push(format!(
        "Equipment loans - exported {}",
        Utc::now().format("%Y-%m-%d %H:%M")
    ));
    lines.push(String::new());
    for loan in loans {
        lines.push(format!(
            "#{}  {} ({})  ->  {}  |  out {}  due {}  |  {}",
            loan.id,
            loan.equipment_name,
            loan.equipment_serial,
            loan.borrower_name,
            format_date(Some(loan.loan_date)),
            format_date(Some(loan.expected_return_date)),
            loan.status,
        ));
    }
    render_pdf(&lines)
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

const LINES_PER_PAGE: usize = 58;

/// Minimal PDF 1.4 writer: one Helvetica font, A4 pages, one text line
/// per row. Object layout: 1 catalog, 2 page tree, 3 font, then a
/// page/content object pair per page.
fn render_pdf(lines: &[String]) -> Vec<u8> {
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![&[]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };
    let page_count = pages.len();

    let mut buf: Vec<u8> = Vec::new();
    let mut offsets: Vec<usize> = Vec::new();
    buf.extend_from_slice(b"%PDF-1.4\n");

    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();

    push_object(
        &mut buf,
        &mut offsets,
        1,
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
    );
    push_object(
        &mut buf,
        &mut offsets,
        2,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        ),
    );
    push_object(
        &mut buf,
        &mut offsets,
        3,
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    );

    for (i, page_lines) in pages.iter().enumerate() {
        let page_obj = 4 + 2 * i;
        let content_obj = page_obj + 1;

        push_object(
            &mut buf,
            &mut offsets,
            page_obj,
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                content_obj
            ),
        );

        let mut content = String::from("BT\n/F1 9 Tf\n13 TL\n40 800 Td\n");
        for line in page_lines.iter() {
            content.push_str(&format!("({}) Tj\nT*\n", pdf_escape(line)));
        }
        content.push_str("ET\n");

        offsets.push(buf.len());
        buf.extend_from_slice(
            format!("{} 0 obj\n<< /Length {} >>\nstream\n", content_obj, content.len()).as_bytes(),
        );
        buf.extend_from_slice(content.as_bytes());
        buf.extend_from_slice(b"endstream\nendobj\n");
    }

    let object_count = 3 + 2 * page_count;
    let xref_offset = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n", object_count + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        buf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count + 1,
            xref_offset
        )
        .as_bytes(),
    );

    buf
}

fn push_object(buf: &mut Vec<u8>, offsets: &mut Vec<usize>, id: usize, body: String) {
    offsets.push(buf.len());
    buf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
}

fn pdf_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::LoanStatus;
    use chrono::TimeZone;

    fn sample_loan() -> LoanDetails {
        LoanDetails {
            id: 3,
            equipment_id: 1,
            equipment_name: "Wheelchair, foldable".to_string(),
            equipment_serial: "WC-0042".to_string(),
            borrower_name: "Nadia \"Nana\" K.".to_string(),
            borrower_phone: "0611223344".to_string(),
            borrower_email: None,
            loan_date: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            expected_return_date: Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap(),
            actual_return_date: None,
            status: LoanStatus::Active,
            cancel_reason: None,
            notes: None,
        }
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        let csv = loans_to_csv(&[sample_loan()]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Wheelchair, foldable\""));
        assert!(row.contains("\"Nadia \"\"Nana\"\" K.\""));
        assert!(row.contains("2025-03-01"));
        assert!(row.ends_with("Active,"));
    }

    #[test]
    fn csv_of_empty_set_is_header_only() {
        assert_eq!(loans_to_csv(&[]), format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn pdf_has_valid_header_and_trailer() {
        let pdf = loans_to_pdf(&[sample_loan()]);
        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("/Count 1"));
        assert!(text.contains("WC-0042"));
    }

    #[test]
    fn long_exports_paginate() {
        let loans: Vec<LoanDetails> = (0..150)
            .map(|i| {
                let mut l = sample_loan();
                l.id = i;
                l
            })
            .collect();
        let pdf = loans_to_pdf(&loans);
        let text = String::from_utf8_lossy(&pdf);
        // 152 lines at 58 per page -> 3 pages
        assert!(text.contains("/Count 3"));
    }
}
