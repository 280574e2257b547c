use crate::errors::{conflict_on_unique, AppError};
use crate::filters::ListOptions;
use crate::models::{
    AddSourceCodeDto, CreateInfluencerDto, Influencer, InfluencerWithCodes, SourceCode,
    UpdateInfluencerDto,
};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

pub const INFLUENCER_SORTABLE: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("name", "name"),
];

/// Gates for issuing a source code, in precedence order: a missing
/// influencer reports before a duplicate code does.
pub fn issue_checks(influencer_exists: bool, code_taken: bool) -> Result<(), AppError> {
    if !influencer_exists {
        return Err(AppError::NotFound("Influencer not found".to_string()));
    }
    if code_taken {
        return Err(AppError::Conflict("Source code already exists".to_string()));
    }
    Ok(())
}

/// Storage service for influencers and their source codes.
pub struct InfluencerStore {
    pool: PgPool,
}

impl InfluencerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, dto: CreateInfluencerDto) -> Result<Influencer, AppError> {
        let influencer = sqlx::query_as::<_, Influencer>(
            "INSERT INTO influencers (name, is_active) VALUES ($1, $2) RETURNING *",
        )
        .bind(&dto.name)
        .bind(dto.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;
        Ok(influencer)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<InfluencerWithCodes>, AppError> {
        let influencer = sqlx::query_as::<_, Influencer>("SELECT * FROM influencers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(influencer) = influencer else {
            return Ok(None);
        };
        let source_codes = sqlx::query_as::<_, SourceCode>(
            "SELECT * FROM influencer_source_codes WHERE influencer_id = $1 ORDER BY activated_at DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(InfluencerWithCodes {
            influencer,
            source_codes,
        }))
    }

    /// All influencers with their full code history, paged.
    pub async fn list(&self, opts: &ListOptions) -> Result<Vec<InfluencerWithCodes>, AppError> {
        let mut qb = QueryBuilder::new("SELECT * FROM influencers WHERE 1=1");
        opts.push_sql(&mut qb);
        let influencers = qb
            .build_query_as::<Influencer>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_codes(influencers, false).await
    }

    /// Active influencers with only their ACTIVE codes, the shape lead entry
    /// forms consume.
    pub async fn list_active(&self) -> Result<Vec<InfluencerWithCodes>, AppError> {
        let influencers = sqlx::query_as::<_, Influencer>(
            "SELECT * FROM influencers WHERE is_active = true ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_codes(influencers, true).await
    }

    async fn attach_codes(
        &self,
        influencers: Vec<Influencer>,
        active_only: bool,
    ) -> Result<Vec<InfluencerWithCodes>, AppError> {
        let ids: Vec<Uuid> = influencers.iter().map(|i| i.id).collect();
        let mut qb = QueryBuilder::new(
            "SELECT * FROM influencer_source_codes WHERE influencer_id = ANY(",
        );
        qb.push_bind(ids).push(")");
        if active_only {
            qb.push(" AND status = 'ACTIVE'");
        }
        qb.push(" ORDER BY activated_at DESC");
        let codes = qb.build_query_as::<SourceCode>().fetch_all(&self.pool).await?;

        Ok(influencers
            .into_iter()
            .map(|influencer| {
                let source_codes = codes
                    .iter()
                    .filter(|c| c.influencer_id == influencer.id)
                    .cloned()
                    .collect();
                InfluencerWithCodes {
                    influencer,
                    source_codes,
                }
            })
            .collect())
    }

    /// Issue a new source code to an influencer.
    ///
    /// Codes are unique across all influencers for all time, active or not.
    /// Issuing a new code retires the influencer's current ACTIVE one, so at
    /// most one code is ever live per influencer. Retired codes stay on
    /// record; historical leads and sales keep resolving through them.
    ///
    /// The existence pre-check gives the friendly error; the unique index on
    /// `code` and the partial one-active index are what actually hold under
    /// concurrency.
    pub async fn add_source_code(
        &self,
        influencer_id: Uuid,
        dto: AddSourceCodeDto,
    ) -> Result<InfluencerWithCodes, AppError> {
        let code = dto.code.trim().to_string();
        if code.is_empty() {
            return Err(AppError::BadRequest(
                "Source code must not be empty".to_string(),
            ));
        }

        let influencer_exists = self.find_by_id(influencer_id).await?.is_some();
        let code_taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM influencer_source_codes WHERE code = $1)",
        )
        .bind(&code)
        .fetch_one(&self.pool)
        .await?;
        issue_checks(influencer_exists, code_taken)?;

        sqlx::query(
            r#"
            UPDATE influencer_source_codes
            SET status = 'INACTIVE', deactivated_at = now()
            WHERE influencer_id = $1 AND status = 'ACTIVE'
            "#,
        )
        .bind(influencer_id)
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, SourceCode>(
            r#"
            INSERT INTO influencer_source_codes (influencer_id, code, status)
            VALUES ($1, $2, 'ACTIVE')
            RETURNING *
            "#,
        )
        .bind(influencer_id)
        .bind(&code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Source code already exists"))?;

        tracing::info!(
            influencer_id = %influencer_id,
            code = %code,
            "Issued new source code"
        );

        self.find_by_id(influencer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Influencer not found".to_string()))
    }

    pub async fn update(
        &self,
        id: Uuid,
        dto: UpdateInfluencerDto,
    ) -> Result<Influencer, AppError> {
        let mut qb = QueryBuilder::new("UPDATE influencers SET updated_at = now()");
        if let Some(name) = &dto.name {
            qb.push(", name = ").push_bind(name.clone());
        }
        if let Some(is_active) = dto.is_active {
            qb.push(", is_active = ").push_bind(is_active);
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        qb.build_query_as::<Influencer>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Influencer not found".to_string()))
    }

    /// Delete an influencer and its code rows. Leads and sales keep their
    /// copied attribution; dashboard joins go null-safe on the name.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM influencers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Influencer not found".to_string()));
        }
        Ok(())
    }
}
