//! Finance-rate catalog ingestion: companies, deposit/saving products, and
//! loan products with their rate options.
//!
//! The page loops are bounded by a caller-supplied `max_pages`, enforced as
//! an outer `1..=max_pages` per institution group; a failed call stops that
//! group only, the remaining groups still run.

use anyhow::{Context, Result};
use tracing::warn;
use ybh_adapters::finlife::{
    DepositOption, DepositPage, FinanceCatalog, FinlifeBase, FinlifeCompany, LoanOption, LoanPage,
    INSTITUTION_GROUPS,
};
use ybh_adapters::FetchOutcome;
use ybh_core::{
    normalize_company_code, CreditGradeRates, FinanceCompany as Company, FinanceLoanOption,
    FinanceProduct, FinanceProductKind, Product, ProductKind,
};
use ybh_storage::Store;

use crate::SourceReport;

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn map_company(raw: &FinlifeCompany) -> Option<Company> {
    let code = normalize_company_code(&raw.fin_co_no);
    // The provider occasionally publishes rows without a company code; fall
    // back to the name so the row still has a usable natural key.
    let company_code = non_blank(&code).or_else(|| {
        raw.kor_co_nm.as_deref().and_then(non_blank)
    })?;
    Some(Company {
        id: None,
        company_code,
        name: raw.kor_co_nm.as_deref().and_then(non_blank),
        homepage: raw.homp_url.as_deref().and_then(non_blank),
        contact: raw.cal_tel.as_deref().and_then(non_blank),
    })
}

pub async fn sync_companies(
    catalog: &dyn FinanceCatalog,
    store: &dyn Store,
    max_pages: u32,
) -> Result<SourceReport> {
    let mut report = SourceReport::new("finlife-companies");
    for group in INSTITUTION_GROUPS {
        for page in 1..=max_pages {
            match catalog.companies(group, page).await {
                FetchOutcome::Page(companies) => {
                    report.pages += 1;
                    for raw in &companies {
                        let Some(company) = map_company(raw) else {
                            report.skipped += 1;
                            continue;
                        };
                        report.record(store.upsert_company(company).await?);
                    }
                }
                FetchOutcome::Empty => break,
                FetchOutcome::Failed(err) => {
                    warn!(group, page, error = %err, "company page failed; stopping group");
                    report.failure = Some(err.to_string());
                    break;
                }
            }
        }
    }
    Ok(report)
}

pub async fn sync_deposit_and_saving(
    catalog: &dyn FinanceCatalog,
    store: &dyn Store,
    max_pages: u32,
) -> Result<SourceReport> {
    let mut report = SourceReport::new("finlife-deposit-saving");
    for kind in [FinanceProductKind::Deposit, FinanceProductKind::Saving] {
        for group in INSTITUTION_GROUPS {
            for page in 1..=max_pages {
                match catalog.deposit_page(kind, group, page).await {
                    FetchOutcome::Page(page_data) => {
                        report.pages += 1;
                        ingest_deposit_page(store, kind, &page_data, &mut report).await?;
                    }
                    FetchOutcome::Empty => break,
                    FetchOutcome::Failed(err) => {
                        warn!(?kind, group, page, error = %err, "product page failed; stopping group");
                        report.failure = Some(err.to_string());
                        break;
                    }
                }
            }
        }
    }
    Ok(report)
}

async fn ingest_deposit_page(
    store: &dyn Store,
    kind: FinanceProductKind,
    page: &DepositPage,
    report: &mut SourceReport,
) -> Result<()> {
    for base in &page.bases {
        if base.fin_prdt_nm.trim().is_empty() {
            report.skipped += 1;
            continue;
        }
        let company_code = normalize_company_code(&base.fin_co_no);

        // Product without a published detail page falls back to the
        // company homepage ingested earlier.
        let detail_url = match base.dcls_url.as_deref().and_then(non_blank) {
            Some(url) => Some(url),
            None => store
                .find_company(&company_code)
                .await?
                .and_then(|c| c.homepage),
        };
        let product = store
            .upsert_product(
                Product::new(ProductKind::Finance, base.fin_prdt_nm.trim(), base.kor_co_nm.trim())
                    .with_detail_url(detail_url),
            )
            .await?;
        let product_id = product.id.context("store returned product without id")?;

        let existing = store.find_finance_product(product_id, &company_code).await?;
        let min_deposit = existing.and_then(|fp| fp.min_deposit);
        let (_, outcome) = store
            .save_finance_product(FinanceProduct {
                id: None,
                product_id,
                company_code,
                kind,
                join_condition: build_join_condition(base),
                interest_rate: representative_deposit_rate(
                    &page.options,
                    &base.fin_prdt_cd,
                    &base.fin_co_no,
                ),
                min_deposit,
            })
            .await?;
        report.record(outcome);
    }
    Ok(())
}

pub async fn sync_loans(
    catalog: &dyn FinanceCatalog,
    store: &dyn Store,
    max_pages: u32,
) -> Result<SourceReport> {
    let mut report = SourceReport::new("finlife-loans");
    for kind in [
        FinanceProductKind::MortgageLoan,
        FinanceProductKind::RentLoan,
        FinanceProductKind::CreditLoan,
    ] {
        for group in INSTITUTION_GROUPS {
            for page in 1..=max_pages {
                match catalog.loan_page(kind, group, page).await {
                    FetchOutcome::Page(page_data) => {
                        report.pages += 1;
                        ingest_loan_page(store, kind, &page_data, &mut report).await?;
                    }
                    FetchOutcome::Empty => break,
                    FetchOutcome::Failed(err) => {
                        warn!(?kind, group, page, error = %err, "loan page failed; stopping group");
                        report.failure = Some(err.to_string());
                        break;
                    }
                }
            }
        }
    }
    Ok(report)
}

async fn ingest_loan_page(
    store: &dyn Store,
    kind: FinanceProductKind,
    page: &LoanPage,
    report: &mut SourceReport,
) -> Result<()> {
    for base in &page.bases {
        if base.fin_prdt_nm.trim().is_empty() {
            report.skipped += 1;
            continue;
        }
        let company_code = normalize_company_code(&base.fin_co_no);
        ensure_company(store, &company_code, &base.kor_co_nm).await?;

        let product = store
            .upsert_product(
                Product::new(ProductKind::Finance, base.fin_prdt_nm.trim(), base.kor_co_nm.trim())
                    .with_detail_url(base.dcls_url.as_deref().and_then(non_blank)),
            )
            .await?;
        let product_id = product.id.context("store returned product without id")?;

        let (finance_product, outcome) = store
            .save_finance_product(FinanceProduct {
                id: None,
                product_id,
                company_code: company_code.clone(),
                kind,
                join_condition: None,
                interest_rate: representative_loan_rate(
                    kind,
                    &page.options,
                    &base.fin_prdt_cd,
                    &base.fin_co_no,
                ),
                min_deposit: None,
            })
            .await?;
        report.record(outcome);
        let finance_product_id = finance_product
            .id
            .context("store returned finance product without id")?;

        for option in page.options.iter().filter(|o| o.fin_prdt_cd == base.fin_prdt_cd) {
            report.record(
                store
                    .merge_loan_option(map_loan_option(kind, finance_product_id, option))
                    .await?,
            );
        }
    }
    Ok(())
}

/// Make sure the institution exists before its loan products reference it;
/// an already-known company is left untouched so a fuller record from the
/// company sync is not overwritten with nulls.
async fn ensure_company(store: &dyn Store, company_code: &str, name: &str) -> Result<()> {
    if company_code.is_empty() || store.find_company(company_code).await?.is_some() {
        return Ok(());
    }
    store
        .upsert_company(Company {
            id: None,
            company_code: company_code.to_string(),
            name: non_blank(name),
            homepage: None,
            contact: None,
        })
        .await?;
    Ok(())
}

fn build_join_condition(base: &FinlifeBase) -> Option<String> {
    let lines: Vec<String> = [
        ("가입 방법: ", base.join_way.as_deref()),
        ("가입 대상: ", base.join_member.as_deref()),
        ("비고: ", base.etc_note.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.and_then(non_blank).map(|v| format!("{label}{v}")))
    .collect();
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn fold_max(rates: impl Iterator<Item = f64>) -> Option<f64> {
    rates.fold(None, |best, rate| match best {
        Some(b) if b >= rate => Some(b),
        _ => Some(rate),
    })
}

/// Deposit/saving headline rate: prefer the bonus rate over the base rate,
/// take the greatest across the matching options.
fn representative_deposit_rate(
    options: &[DepositOption],
    product_code: &str,
    company_code: &str,
) -> Option<f64> {
    fold_max(
        options
            .iter()
            .filter(|o| o.fin_prdt_cd == product_code && o.fin_co_no == company_code)
            .filter_map(|o| o.intr_rate2.or(o.intr_rate)),
    )
}

/// Loan headline rate: avg, falling back to max then min, per option;
/// credit loans use the greatest grade-average instead.
fn representative_loan_rate(
    kind: FinanceProductKind,
    options: &[LoanOption],
    product_code: &str,
    company_code: &str,
) -> Option<f64> {
    let matching = options
        .iter()
        .filter(|o| o.fin_prdt_cd == product_code && o.fin_co_no == company_code);
    if kind == FinanceProductKind::CreditLoan {
        fold_max(matching.filter_map(|o| o.crdt_grad_avg))
    } else {
        fold_max(matching.filter_map(|o| {
            o.lend_rate_avg.or(o.lend_rate_max).or(o.lend_rate_min)
        }))
    }
}

fn map_loan_option(
    kind: FinanceProductKind,
    finance_product_id: i64,
    option: &LoanOption,
) -> FinanceLoanOption {
    let is_credit = kind == FinanceProductKind::CreditLoan;
    FinanceLoanOption {
        id: None,
        finance_product_id,
        lend_rate_min: option.lend_rate_min,
        lend_rate_avg: option.lend_rate_avg,
        lend_rate_max: option.lend_rate_max,
        repay_type_name: option.rpay_type_nm.as_deref().and_then(non_blank),
        rate_type_name: option.lend_rate_type_nm.as_deref().and_then(non_blank),
        // Credit loans carry no collateral type.
        collateral_type_name: if is_credit {
            None
        } else {
            option.mrtg_type_nm.as_deref().and_then(non_blank)
        },
        credit_rate_type: option.crdt_lend_rate_type.as_deref().and_then(non_blank),
        credit_rate_type_name: option.crdt_lend_rate_type_nm.as_deref().and_then(non_blank),
        credit_grades: if is_credit {
            CreditGradeRates {
                grade_1: option.crdt_grad_1,
                grade_4: option.crdt_grad_4,
                grade_5: option.crdt_grad_5,
                grade_6: option.crdt_grad_6,
                grade_10: option.crdt_grad_10,
                grade_11: option.crdt_grad_11,
                grade_12: option.crdt_grad_12,
                grade_13: option.crdt_grad_13,
                grade_avg: option.crdt_grad_avg,
            }
        } else {
            CreditGradeRates::default()
        },
    }
}
