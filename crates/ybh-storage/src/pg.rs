//! Postgres implementation of the store traits over runtime sqlx queries.
//!
//! Every upsert is its own atomic unit: a failure mid-page never corrupts a
//! single record and never rolls back earlier records of the same page.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use ybh_core::{
    Attachment, CreditGradeRates, FinanceCompany, FinanceLoanOption, FinanceProduct,
    FinanceProductKind, LhNotice, Product, ProductKind, RecruitStatus, ShAnnouncement, ShCategory,
    YouthPolicy,
};

use crate::{FinanceStore, HousingStore, PolicyStore, StoreError, UpsertOutcome};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self, migrations_dir: &Path) -> anyhow::Result<()> {
        let migrator = sqlx::migrate::Migrator::new(migrations_dir.to_path_buf()).await?;
        migrator.run(&self.pool).await?;
        Ok(())
    }

    async fn insert_product_row(&self, product: &Product) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (kind, name, provider, detail_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(product.kind.as_str())
        .bind(&product.name)
        .bind(&product.provider)
        .bind(&product.detail_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("id")?)
    }
}

fn product_kind_from_str(raw: &str) -> Result<ProductKind, StoreError> {
    match raw {
        "HOUSING" => Ok(ProductKind::Housing),
        "FINANCE" => Ok(ProductKind::Finance),
        "POLICY" => Ok(ProductKind::Policy),
        other => Err(StoreError::Message(format!("unknown product kind {other}"))),
    }
}

fn finance_kind_from_str(raw: &str) -> Result<FinanceProductKind, StoreError> {
    match raw {
        "DEPOSIT" => Ok(FinanceProductKind::Deposit),
        "SAVING" => Ok(FinanceProductKind::Saving),
        "MORTGAGE_LOAN" => Ok(FinanceProductKind::MortgageLoan),
        "RENT_LOAN" => Ok(FinanceProductKind::RentLoan),
        "CREDIT_LOAN" => Ok(FinanceProductKind::CreditLoan),
        other => Err(StoreError::Message(format!("unknown finance kind {other}"))),
    }
}

fn recruit_status_as_str(status: RecruitStatus) -> &'static str {
    match status {
        RecruitStatus::Now => "now",
        RecruitStatus::Done => "done",
    }
}

fn recruit_status_from_str(raw: &str) -> RecruitStatus {
    match raw {
        "now" => RecruitStatus::Now,
        _ => RecruitStatus::Done,
    }
}

fn sh_category_as_str(category: ShCategory) -> &'static str {
    match category {
        ShCategory::Rent => "주택임대",
        ShCategory::Sale => "주택분양",
    }
}

fn sh_category_from_str(raw: &str) -> ShCategory {
    match raw {
        "주택분양" => ShCategory::Sale,
        _ => ShCategory::Rent,
    }
}

fn finance_product_from_row(row: &PgRow) -> Result<FinanceProduct, StoreError> {
    let kind: String = row.try_get("kind")?;
    Ok(FinanceProduct {
        id: Some(row.try_get("id")?),
        product_id: row.try_get("product_id")?,
        company_code: row.try_get("company_code")?,
        kind: finance_kind_from_str(&kind)?,
        join_condition: row.try_get("join_condition")?,
        interest_rate: row.try_get("interest_rate")?,
        min_deposit: row.try_get("min_deposit")?,
    })
}

fn loan_option_from_row(row: &PgRow) -> Result<FinanceLoanOption, StoreError> {
    let grades: serde_json::Value = row.try_get("credit_grades")?;
    let credit_grades: CreditGradeRates = serde_json::from_value(grades)
        .map_err(|e| StoreError::Message(format!("decoding credit grades: {e}")))?;
    Ok(FinanceLoanOption {
        id: Some(row.try_get("id")?),
        finance_product_id: row.try_get("finance_product_id")?,
        lend_rate_min: row.try_get("lend_rate_min")?,
        lend_rate_avg: row.try_get("lend_rate_avg")?,
        lend_rate_max: row.try_get("lend_rate_max")?,
        repay_type_name: row.try_get("repay_type_name")?,
        rate_type_name: row.try_get("rate_type_name")?,
        collateral_type_name: row.try_get("collateral_type_name")?,
        credit_rate_type: row.try_get("credit_rate_type")?,
        credit_rate_type_name: row.try_get("credit_rate_type_name")?,
        credit_grades,
    })
}

fn lh_notice_from_row(row: &PgRow) -> Result<LhNotice, StoreError> {
    Ok(LhNotice {
        id: Some(row.try_get("id")?),
        product_id: row.try_get("product_id")?,
        notice_kind: row.try_get("notice_kind")?,
        notice_detail_kind: row.try_get("notice_detail_kind")?,
        title: row.try_get("title")?,
        region_name: row.try_get("region_name")?,
        status: row.try_get("status")?,
        notice_date: row.try_get("notice_date")?,
        close_date: row.try_get("close_date")?,
        detail_url: row.try_get("detail_url")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn sh_announcement_from_row(row: &PgRow) -> Result<ShAnnouncement, StoreError> {
    let status: String = row.try_get("recruit_status")?;
    let category: String = row.try_get("category")?;
    let attachments: serde_json::Value = row.try_get("attachments")?;
    let attachments: Vec<Attachment> = serde_json::from_value(attachments)
        .map_err(|e| StoreError::Message(format!("decoding attachments: {e}")))?;
    Ok(ShAnnouncement {
        id: Some(row.try_get("id")?),
        product_id: row.try_get("product_id")?,
        source: row.try_get("source")?,
        external_id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        department: row.try_get("department")?,
        post_date: row.try_get::<Option<NaiveDate>, _>("post_date")?,
        views: row.try_get("views")?,
        recruit_status: recruit_status_from_str(&status),
        supply_type: row.try_get("supply_type")?,
        category: sh_category_from_str(&category),
        region: row.try_get("region")?,
        content_html: row.try_get("content_html")?,
        attachments,
        detail_url: row.try_get("detail_url")?,
        crawled_at: row.try_get::<DateTime<Utc>, _>("crawled_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn youth_policy_from_row(row: &PgRow) -> Result<YouthPolicy, StoreError> {
    Ok(YouthPolicy {
        id: Some(row.try_get("id")?),
        product_id: row.try_get("product_id")?,
        policy_no: row.try_get("policy_no")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        keyword: row.try_get("keyword")?,
        category_large: row.try_get("category_large")?,
        category_middle: row.try_get("category_middle")?,
        agency: row.try_get("agency")?,
        apply_url: row.try_get("apply_url")?,
        region_code: row.try_get("region_code")?,
        min_age: row.try_get::<Option<i32>, _>("min_age")?.map(|v| v as u32),
        max_age: row.try_get::<Option<i32>, _>("max_age")?.map(|v| v as u32),
        support_content: row.try_get("support_content")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl FinanceStore for PgStore {
    async fn upsert_company(&self, company: FinanceCompany) -> Result<UpsertOutcome, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO finance_companies (company_code, name, homepage, contact)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (company_code)
            DO UPDATE SET name = EXCLUDED.name,
                          homepage = EXCLUDED.homepage,
                          contact = EXCLUDED.contact
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&company.company_code)
        .bind(&company.name)
        .bind(&company.homepage)
        .bind(&company.contact)
        .fetch_one(&self.pool)
        .await?;
        let inserted: bool = row.try_get("inserted")?;
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn find_company(&self, company_code: &str) -> Result<Option<FinanceCompany>, StoreError> {
        let row = sqlx::query(
            "SELECT id, company_code, name, homepage, contact FROM finance_companies WHERE company_code = $1",
        )
        .bind(company_code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| {
            Ok(FinanceCompany {
                id: Some(r.try_get("id")?),
                company_code: r.try_get("company_code")?,
                name: r.try_get("name")?,
                homepage: r.try_get("homepage")?,
                contact: r.try_get("contact")?,
            })
        })
        .transpose()
    }

    async fn upsert_product(&self, product: Product) -> Result<Product, StoreError> {
        let existing = sqlx::query(
            r#"
            SELECT id, kind, name, provider, detail_url
              FROM products
             WHERE kind = $1 AND name = $2 AND provider = $3
            "#,
        )
        .bind(product.kind.as_str())
        .bind(&product.name)
        .bind(&product.provider)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                sqlx::query("UPDATE products SET detail_url = $1 WHERE id = $2")
                    .bind(&product.detail_url)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
                Ok(Product {
                    id: Some(id),
                    ..product
                })
            }
            None => {
                let id = self.insert_product_row(&product).await?;
                Ok(Product {
                    id: Some(id),
                    ..product
                })
            }
        }
    }

    async fn find_finance_product(
        &self,
        product_id: i64,
        company_code: &str,
    ) -> Result<Option<FinanceProduct>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, company_code, kind, join_condition, interest_rate, min_deposit
              FROM finance_products
             WHERE product_id = $1 AND company_code = $2
            "#,
        )
        .bind(product_id)
        .bind(company_code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| finance_product_from_row(&r)).transpose()
    }

    async fn save_finance_product(
        &self,
        finance_product: FinanceProduct,
    ) -> Result<(FinanceProduct, UpsertOutcome), StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO finance_products
                (product_id, company_code, kind, join_condition, interest_rate, min_deposit)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (product_id, company_code)
            DO UPDATE SET kind = EXCLUDED.kind,
                          join_condition = EXCLUDED.join_condition,
                          interest_rate = EXCLUDED.interest_rate,
                          min_deposit = EXCLUDED.min_deposit
            RETURNING id, (xmax = 0) AS inserted
            "#,
        )
        .bind(finance_product.product_id)
        .bind(&finance_product.company_code)
        .bind(finance_product.kind.as_str())
        .bind(&finance_product.join_condition)
        .bind(finance_product.interest_rate)
        .bind(finance_product.min_deposit)
        .fetch_one(&self.pool)
        .await?;
        let id: i64 = row.try_get("id")?;
        let inserted: bool = row.try_get("inserted")?;
        Ok((
            FinanceProduct {
                id: Some(id),
                ..finance_product
            },
            if inserted {
                UpsertOutcome::Inserted
            } else {
                UpsertOutcome::Updated
            },
        ))
    }

    async fn merge_loan_option(
        &self,
        option: FinanceLoanOption,
    ) -> Result<UpsertOutcome, StoreError> {
        let grades = serde_json::to_value(&option.credit_grades)
            .map_err(|e| StoreError::Message(format!("encoding credit grades: {e}")))?;
        let existing = sqlx::query(
            r#"
            SELECT id
              FROM finance_loan_options
             WHERE finance_product_id = $1
               AND repay_type_name IS NOT DISTINCT FROM $2
               AND rate_type_name IS NOT DISTINCT FROM $3
               AND collateral_type_name IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(option.finance_product_id)
        .bind(&option.repay_type_name)
        .bind(&option.rate_type_name)
        .bind(&option.collateral_type_name)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some(row) => {
                let id: i64 = row.try_get("id")?;
                sqlx::query(
                    r#"
                    UPDATE finance_loan_options
                       SET lend_rate_min = $1,
                           lend_rate_avg = $2,
                           lend_rate_max = $3,
                           credit_rate_type = $4,
                           credit_rate_type_name = $5,
                           credit_grades = $6
                     WHERE id = $7
                    "#,
                )
                .bind(option.lend_rate_min)
                .bind(option.lend_rate_avg)
                .bind(option.lend_rate_max)
                .bind(&option.credit_rate_type)
                .bind(&option.credit_rate_type_name)
                .bind(&grades)
                .bind(id)
                .execute(&self.pool)
                .await?;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO finance_loan_options
                        (finance_product_id, lend_rate_min, lend_rate_avg, lend_rate_max,
                         repay_type_name, rate_type_name, collateral_type_name,
                         credit_rate_type, credit_rate_type_name, credit_grades)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    "#,
                )
                .bind(option.finance_product_id)
                .bind(option.lend_rate_min)
                .bind(option.lend_rate_avg)
                .bind(option.lend_rate_max)
                .bind(&option.repay_type_name)
                .bind(&option.rate_type_name)
                .bind(&option.collateral_type_name)
                .bind(&option.credit_rate_type)
                .bind(&option.credit_rate_type_name)
                .bind(&grades)
                .execute(&self.pool)
                .await?;
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn list_finance_products(
        &self,
        kind: FinanceProductKind,
    ) -> Result<Vec<(FinanceProduct, Product)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT fp.id, fp.product_id, fp.company_code, fp.kind,
                   fp.join_condition, fp.interest_rate, fp.min_deposit,
                   p.id AS p_id, p.kind AS p_kind, p.name, p.provider, p.detail_url
              FROM finance_products fp
              JOIN products p ON p.id = fp.product_id
             WHERE fp.kind = $1
             ORDER BY fp.id
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let finance_product = finance_product_from_row(&row)?;
            let p_kind: String = row.try_get("p_kind")?;
            let product = Product {
                id: Some(row.try_get("p_id")?),
                kind: product_kind_from_str(&p_kind)?,
                name: row.try_get("name")?,
                provider: row.try_get("provider")?,
                detail_url: row.try_get("detail_url")?,
            };
            out.push((finance_product, product));
        }
        Ok(out)
    }

    async fn list_loan_options(
        &self,
        finance_product_id: i64,
    ) -> Result<Vec<FinanceLoanOption>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, finance_product_id, lend_rate_min, lend_rate_avg, lend_rate_max,
                   repay_type_name, rate_type_name, collateral_type_name,
                   credit_rate_type, credit_rate_type_name, credit_grades
              FROM finance_loan_options
             WHERE finance_product_id = $1
             ORDER BY id
            "#,
        )
        .bind(finance_product_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(loan_option_from_row).collect()
    }
}

#[async_trait]
impl HousingStore for PgStore {
    async fn lh_notice_exists(&self, title: &str, notice_date: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS one FROM lh_notices WHERE title = $1 AND notice_date = $2")
            .bind(title)
            .bind(notice_date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn insert_lh_notice(
        &self,
        product: Product,
        notice: LhNotice,
    ) -> Result<UpsertOutcome, StoreError> {
        if self.lh_notice_exists(&notice.title, &notice.notice_date).await? {
            return Ok(UpsertOutcome::Skipped);
        }
        let product_id = self.insert_product_row(&product).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO lh_notices
                (product_id, notice_kind, notice_detail_kind, title, region_name,
                 status, notice_date, close_date, detail_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (title, notice_date) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(&notice.notice_kind)
        .bind(&notice.notice_detail_kind)
        .bind(&notice.title)
        .bind(&notice.region_name)
        .bind(&notice.status)
        .bind(&notice.notice_date)
        .bind(&notice.close_date)
        .bind(&notice.detail_url)
        .bind(notice.created_at)
        .execute(&self.pool)
        .await?;
        // A concurrent run winning the race is "already exists", not an error.
        Ok(if result.rows_affected() == 0 {
            UpsertOutcome::Skipped
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn list_lh_notices(&self) -> Result<Vec<LhNotice>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, notice_kind, notice_detail_kind, title, region_name,
                   status, notice_date, close_date, detail_url, created_at
              FROM lh_notices
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(lh_notice_from_row).collect()
    }

    async fn recent_lh_notices(&self, limit: usize) -> Result<Vec<LhNotice>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, notice_kind, notice_detail_kind, title, region_name,
                   status, notice_date, close_date, detail_url, created_at
              FROM lh_notices
             ORDER BY notice_date DESC
             LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(lh_notice_from_row).collect()
    }

    async fn find_sh_announcement(
        &self,
        source: &str,
        external_id: &str,
    ) -> Result<Option<ShAnnouncement>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, source, external_id, title, department, post_date, views,
                   recruit_status, supply_type, category, region, content_html, attachments,
                   detail_url, crawled_at, updated_at
              FROM sh_announcements
             WHERE source = $1 AND external_id = $2
            "#,
        )
        .bind(source)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| sh_announcement_from_row(&r)).transpose()
    }

    async fn upsert_sh_announcement(
        &self,
        product: Product,
        announcement: ShAnnouncement,
    ) -> Result<UpsertOutcome, StoreError> {
        let attachments = serde_json::to_value(&announcement.attachments)
            .map_err(|e| StoreError::Message(format!("encoding attachments: {e}")))?;

        if let Some(existing) = self
            .find_sh_announcement(&announcement.source, &announcement.external_id)
            .await?
        {
            sqlx::query(
                r#"
                UPDATE sh_announcements
                   SET title = $1, department = $2, post_date = $3, views = $4,
                       recruit_status = $5, supply_type = $6, category = $7, region = $8,
                       content_html = $9, attachments = $10, detail_url = $11, updated_at = $12
                 WHERE id = $13
                "#,
            )
            .bind(&announcement.title)
            .bind(&announcement.department)
            .bind(announcement.post_date)
            .bind(announcement.views)
            .bind(recruit_status_as_str(announcement.recruit_status))
            .bind(&announcement.supply_type)
            .bind(sh_category_as_str(announcement.category))
            .bind(&announcement.region)
            .bind(&announcement.content_html)
            .bind(&attachments)
            .bind(&announcement.detail_url)
            .bind(announcement.updated_at)
            .bind(existing.id)
            .execute(&self.pool)
            .await?;
            return Ok(UpsertOutcome::Updated);
        }

        let product_id = self.insert_product_row(&product).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO sh_announcements
                (product_id, source, external_id, title, department, post_date, views,
                 recruit_status, supply_type, category, region, content_html, attachments,
                 detail_url, crawled_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (source, external_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(&announcement.source)
        .bind(&announcement.external_id)
        .bind(&announcement.title)
        .bind(&announcement.department)
        .bind(announcement.post_date)
        .bind(announcement.views)
        .bind(recruit_status_as_str(announcement.recruit_status))
        .bind(&announcement.supply_type)
        .bind(sh_category_as_str(announcement.category))
        .bind(&announcement.region)
        .bind(&announcement.content_html)
        .bind(&attachments)
        .bind(&announcement.detail_url)
        .bind(announcement.crawled_at)
        .bind(announcement.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(if result.rows_affected() == 0 {
            UpsertOutcome::Skipped
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn list_sh_announcements(&self) -> Result<Vec<ShAnnouncement>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, source, external_id, title, department, post_date, views,
                   recruit_status, supply_type, category, region, content_html, attachments,
                   detail_url, crawled_at, updated_at
              FROM sh_announcements
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(sh_announcement_from_row).collect()
    }

    async fn recent_sh_announcements(
        &self,
        limit: usize,
    ) -> Result<Vec<ShAnnouncement>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, source, external_id, title, department, post_date, views,
                   recruit_status, supply_type, category, region, content_html, attachments,
                   detail_url, crawled_at, updated_at
              FROM sh_announcements
             ORDER BY post_date DESC NULLS LAST
             LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(sh_announcement_from_row).collect()
    }
}

#[async_trait]
impl PolicyStore for PgStore {
    async fn policy_exists(&self, policy_no: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS one FROM youth_policies WHERE policy_no = $1")
            .bind(policy_no)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn insert_policy(
        &self,
        product: Product,
        policy: YouthPolicy,
    ) -> Result<UpsertOutcome, StoreError> {
        if self.policy_exists(&policy.policy_no).await? {
            return Ok(UpsertOutcome::Skipped);
        }
        let product_id = self.insert_product_row(&product).await?;
        let result = sqlx::query(
            r#"
            INSERT INTO youth_policies
                (product_id, policy_no, name, description, keyword, category_large,
                 category_middle, agency, apply_url, region_code, min_age, max_age,
                 support_content, start_date, end_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (policy_no) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(&policy.policy_no)
        .bind(&policy.name)
        .bind(&policy.description)
        .bind(&policy.keyword)
        .bind(&policy.category_large)
        .bind(&policy.category_middle)
        .bind(&policy.agency)
        .bind(&policy.apply_url)
        .bind(&policy.region_code)
        .bind(policy.min_age.map(|v| v as i32))
        .bind(policy.max_age.map(|v| v as i32))
        .bind(&policy.support_content)
        .bind(&policy.start_date)
        .bind(&policy.end_date)
        .bind(policy.created_at)
        .execute(&self.pool)
        .await?;
        Ok(if result.rows_affected() == 0 {
            UpsertOutcome::Skipped
        } else {
            UpsertOutcome::Inserted
        })
    }

    async fn list_policies(&self) -> Result<Vec<YouthPolicy>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, policy_no, name, description, keyword, category_large,
                   category_middle, agency, apply_url, region_code, min_age, max_age,
                   support_content, start_date, end_date, created_at
              FROM youth_policies
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(youth_policy_from_row).collect()
    }

    async fn recent_active_policies(
        &self,
        today_compact: &str,
        limit: usize,
    ) -> Result<Vec<YouthPolicy>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, policy_no, name, description, keyword, category_large,
                   category_middle, agency, apply_url, region_code, min_age, max_age,
                   support_content, start_date, end_date, created_at
              FROM youth_policies
             WHERE end_date IS NULL OR end_date = '00000000' OR end_date >= $1
             ORDER BY start_date DESC NULLS LAST
             LIMIT $2
            "#,
        )
        .bind(today_compact)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(youth_policy_from_row).collect()
    }
}
