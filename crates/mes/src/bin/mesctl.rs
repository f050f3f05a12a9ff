use mes::client::{HttpRoutingBackend, OperationList, ResourceLoader, RoutingBackend};
use mes::config::ClientConfig;
use mes::routing::Operation;
use sqlx::PgPool;
use std::env;

const USAGE: &str = "mesctl <command>\n\
     Database commands (DATABASE_URL or TEST_DATABASE_URL):\n\
     - reset\n\
     - seed <n>\n\
     - demo\n\
     Routing commands (MES_BASE_URL, default http://localhost:8080):\n\
     - routing list\n\
     - routing start <id>\n\
     - routing complete <id>\n\
     - routing reorder <from> <to> [--batched]\n";

const SAMPLE_OPERATIONS: &[(&str, &str, i32)] = &[
    ("P-DGR", "Degreasing", 15),
    ("P-PRM", "Primer", 30),
    ("P-BSC", "Base coat", 40),
    ("P-CLR", "Clear coat", 35),
    ("P-DRY", "Drying", 60),
    ("P-INS", "Inspection", 10),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mes::logging::init();
    let args: Vec<String> = env::args().collect();

    let Some(command) = args.get(1) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    match command.as_str() {
        "reset" => reset(&connect().await?).await?,
        "seed" => {
            let n: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(6);
            seed(&connect().await?, n).await?;
        }
        "demo" => {
            let pool = connect().await?;
            reset(&pool).await?;
            seed(&pool, SAMPLE_OPERATIONS.len()).await?;
            seed_materials(&pool).await?;
            seed_sales(&pool).await?;
            show_counts(&pool).await?;
        }
        "routing" => routing(&args[2..]).await?,
        other => {
            eprintln!("Unknown command: {other}\n\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    dotenvy::dotenv().ok();
    let url = env::var("DATABASE_URL")
        .or_else(|_| env::var("TEST_DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("DATABASE_URL or TEST_DATABASE_URL must be set"))?;
    mes::db::make_pool(&url).await
}

// ---- Database commands ----

async fn reset(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        TRUNCATE TABLE
            sales_inbound,
            sales_item_operations,
            sales_items,
            raw_outbound,
            raw_inbound,
            inventory,
            raw_items,
            partners,
            operations
        RESTART IDENTITY CASCADE
        "#,
    )
    .execute(pool)
    .await?;

    println!("reset OK");
    Ok(())
}

/// Registers `n` sample operations through the repo so orders are appended
/// the same way the API does it.
async fn seed(pool: &PgPool, n: usize) -> anyhow::Result<()> {
    let repo = mes::routing::OperationsRepo::new(pool.clone());

    for i in 0..n {
        let (code, name, minutes) = SAMPLE_OPERATIONS[i % SAMPLE_OPERATIONS.len()];
        let code = if i < SAMPLE_OPERATIONS.len() {
            code.to_string()
        } else {
            format!("{code}-{i}")
        };
        if repo.is_code_taken(&code).await? {
            println!("= skipped {code} (exists)");
            continue;
        }

        let op = repo
            .register(mes::routing::NewOperation {
                code,
                name: name.to_string(),
                description: None,
                standard_time: minutes,
            })
            .await?;
        println!("+ inserted operation {} order={} id={}", op.code, op.order, op.id);
    }
    Ok(())
}

async fn seed_materials(pool: &PgPool) -> anyhow::Result<()> {
    let partners = mes::partners::PartnersRepo::new(pool.clone());
    let items = mes::items::RawItemsRepo::new(pool.clone());

    let supplier = partners
        .register(serde_json::from_value(serde_json::json!({
            "partnerType": "supplier",
            "name": "Hanil Paint",
            "representativeEmail": "sales@hanil.example"
        }))?)
        .await?;
    println!("+ inserted supplier {} id={}", supplier.name, supplier.id);

    for (code, name) in [("RM-001", "Epoxy primer"), ("RM-002", "Urethane thinner")] {
        let item = items
            .register(serde_json::from_value(serde_json::json!({
                "itemCode": code,
                "itemName": name,
                "supplierId": supplier.id
            }))?)
            .await?;
        println!("+ inserted raw item {} id={}", item.item_code, item.id);
    }
    Ok(())
}

/// One customer item routed through every seeded operation, plus one LOT.
async fn seed_sales(pool: &PgPool) -> anyhow::Result<()> {
    let partners = mes::partners::PartnersRepo::new(pool.clone());
    let sales = mes::sales::SalesRepo::new(pool.clone());
    let operations = mes::routing::OperationsRepo::new(pool.clone());

    let customer = partners
        .register(serde_json::from_value(serde_json::json!({
            "partnerType": "customer",
            "name": "Daesung Motors"
        }))?)
        .await?;
    println!("+ inserted customer {} id={}", customer.name, customer.id);

    let operation_ids: Vec<i64> = operations
        .list_status()
        .await?
        .iter()
        .map(|op| op.id)
        .collect();
    let item = sales
        .register_item(serde_json::from_value(serde_json::json!({
            "partnerId": customer.id,
            "itemCode": "SI-001",
            "itemName": "Bumper cover",
            "classification": "exterior",
            "coatingMethod": "spray",
            "operationIds": operation_ids
        }))?)
        .await?;
    println!(
        "+ inserted sales item {} id={} operations={}",
        item.item_code, item.id, item.total_operations
    );

    let inbound = sales
        .register_inbound(mes::sales::NewSalesInbound {
            sales_item_id: item.id,
            qty: 40,
            received_at: chrono::Local::now().date_naive(),
        })
        .await?;
    println!("+ received LOT {} qty={}", inbound.lot_number, inbound.qty);
    Ok(())
}

async fn show_counts(pool: &PgPool) -> anyhow::Result<()> {
    let ops: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM operations")
        .fetch_one(pool)
        .await?;
    let partners: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM partners")
        .fetch_one(pool)
        .await?;
    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM raw_items")
        .fetch_one(pool)
        .await?;

    let sales_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales_items")
        .fetch_one(pool)
        .await?;

    println!("operations={ops} partners={partners} raw_items={items} sales_items={sales_items}");
    Ok(())
}

// ---- Routing commands (through the HTTP client) ----

async fn routing(args: &[String]) -> anyhow::Result<()> {
    let backend = HttpRoutingBackend::new(&ClientConfig::from_env())?;
    let id_arg = |i: usize| -> anyhow::Result<i64> {
        args.get(i)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow::anyhow!("expected an operation id\n\n{USAGE}"))
    };

    match args.first().map(String::as_str) {
        Some("list") => {
            let fetch = backend.clone();
            let loader = ResourceLoader::spawn(async move { fetch.fetch_operations().await });
            print_rows(&loader.ready().await?);
        }
        Some("start") => {
            let mut list = OperationList::new(backend);
            list.load().await?;
            list.select(id_arg(1)?)?;
            list.start().await?;
            print_rows(list.rows());
        }
        Some("complete") => {
            let mut list = OperationList::new(backend);
            list.load().await?;
            list.select(id_arg(1)?)?;
            list.complete().await?;
            print_rows(list.rows());
        }
        Some("reorder") => {
            let index = |i: usize| -> anyhow::Result<usize> {
                args.get(i)
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| anyhow::anyhow!("expected row indexes\n\n{USAGE}"))
            };
            let (from, to) = (index(1)?, index(2)?);
            let batched = args.iter().any(|a| a == "--batched");

            let mut list = OperationList::new(backend);
            list.load().await?;
            list.toggle_edit();
            list.reorder(from, to)?;
            if batched {
                list.save_batched().await?;
            } else {
                list.save().await?;
            }
            print_rows(list.rows());
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn print_rows(rows: &[Operation]) {
    println!("{:>5}  {:>5}  {:<12} {:<24} {:<12} start", "order", "id", "code", "name", "status");
    for op in rows {
        let start = op
            .start_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>5}  {:>5}  {:<12} {:<24} {:<12} {start}",
            op.order, op.id, op.code, op.name, op.status
        );
    }
}
