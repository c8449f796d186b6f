//! Product catalog persistence.
//!
//! Plain CRUD over the `products` table. Index maintenance is not done
//! here; callers run the reindex hook after a successful mutation so
//! the product index tracks the catalog.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Product, ProductInput};

pub async fn list_products(pool: &SqlitePool) -> Result<Vec<Product>> {
    let rows = sqlx::query(
        "SELECT id, name, price, category, description, image, gender, color, in_stock
         FROM products ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_product).collect())
}

pub async fn get_product(pool: &SqlitePool, id: &str) -> Result<Option<Product>> {
    let row = sqlx::query(
        "SELECT id, name, price, category, description, image, gender, color, in_stock
         FROM products WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(row_to_product))
}

pub async fn create_product(pool: &SqlitePool, input: &ProductInput) -> Result<Product> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO products (id, name, price, category, description, image, gender, color, in_stock, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&input.name)
    .bind(input.price)
    .bind(&input.category)
    .bind(&input.description)
    .bind(&input.image)
    .bind(&input.gender)
    .bind(&input.color)
    .bind(input.in_stock)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Product {
        id,
        name: input.name.clone(),
        price: input.price,
        category: input.category.clone(),
        description: input.description.clone(),
        image: input.image.clone(),
        gender: input.gender.clone(),
        color: input.color.clone(),
        in_stock: input.in_stock,
    })
}

/// Returns the updated product, or `None` when no such id exists.
pub async fn update_product(
    pool: &SqlitePool,
    id: &str,
    input: &ProductInput,
) -> Result<Option<Product>> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET name = ?, price = ?, category = ?, description = ?, image = ?,
            gender = ?, color = ?, in_stock = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(input.price)
    .bind(&input.category)
    .bind(&input.description)
    .bind(&input.image)
    .bind(&input.gender)
    .bind(&input.color)
    .bind(input.in_stock)
    .bind(Utc::now().timestamp())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_product(pool, id).await
}

/// Returns whether a row was actually removed.
pub async fn delete_product(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load a JSON array of products into the catalog. Products in the file
/// carry no ids; each gets a fresh one. Returns the inserted products.
pub async fn seed_from_file(pool: &SqlitePool, path: &std::path::Path) -> Result<Vec<Product>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file: {}", path.display()))?;
    let inputs: Vec<ProductInput> =
        serde_json::from_str(&content).with_context(|| "seed file must be a JSON product array")?;

    let mut created = Vec::with_capacity(inputs.len());
    for input in &inputs {
        created.push(create_product(pool, input).await?);
    }
    Ok(created)
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        price: row.get("price"),
        category: row.get("category"),
        description: row.get("description"),
        image: row.get("image"),
        gender: row.get("gender"),
        color: row.get("color"),
        in_stock: row.get("in_stock"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::migrate;
    use tempfile::TempDir;

    async fn pool() -> (TempDir, SqlitePool) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.db.path = tmp.path().join("catalog.sqlite");
        let pool = db::connect(&config.db).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        (tmp, pool)
    }

    fn input(name: &str, price: f64) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            price,
            category: "Sports & Outdoors".to_string(),
            description: format!("{} description", name),
            image: None,
            gender: None,
            color: None,
            in_stock: None,
        }
    }

    #[tokio::test]
    async fn create_list_update_delete() {
        let (_tmp, pool) = pool().await;

        let created = create_product(&pool, &input("Yoga Mat", 69.90)).await.unwrap();
        assert!(!created.id.is_empty());

        let all = list_products(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Yoga Mat");

        let updated = update_product(&pool, &created.id, &input("Yoga Mat Pro", 89.90))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Yoga Mat Pro");
        assert!((updated.price - 89.90).abs() < 1e-9);

        assert!(delete_product(&pool, &created.id).await.unwrap());
        assert!(!delete_product(&pool, &created.id).await.unwrap());
        assert!(list_products(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_missing_product_is_none() {
        let (_tmp, pool) = pool().await;
        let result = update_product(&pool, "nope", &input("X", 1.0)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn seed_loads_json_array() {
        let (_tmp, pool) = pool().await;
        let seed_path = _tmp.path().join("products.json");
        std::fs::write(
            &seed_path,
            r#"[
                {"name":"Yoga Mat","price":69.90,"category":"Sports & Outdoors","description":"Eco-friendly, non-slip yoga mat with carrying strap."},
                {"name":"Dumbbell Set","price":199.00,"category":"Sports & Outdoors","description":"Adjustable dumbbell set suitable for home workouts."}
            ]"#,
        )
        .unwrap();

        let created = seed_from_file(&pool, &seed_path).await.unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(list_products(&pool).await.unwrap().len(), 2);
    }
}
