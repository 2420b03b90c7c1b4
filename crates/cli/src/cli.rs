use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use ordergate_core::{PageRequest, ProductId, PurchaseId, SortDirection, UserId};
use ordergate_infra::{Config, Coordinator, build_coordinator};
use ordergate_purchasing::{PurchaseError, PurchaseRequest};

#[derive(Debug, Parser)]
#[command(name = "ordergate", about = "Stock-checked purchase coordinator", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reserve stock and record a purchase
    Create(CreateArgs),
    /// List a user's paid purchases
    List(ListArgs),
    /// Show one purchase
    Get(PurchaseArgs),
    /// Overwrite a purchase's status
    Status(StatusArgs),
    /// Cancel a purchase (stock is not released)
    Cancel(PurchaseArgs),
    /// Print the product and quantity of a purchase
    ProductRef(PurchaseArgs),
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(long)]
    user_id: UserId,

    #[arg(long)]
    product_id: ProductId,

    #[arg(long)]
    quantity: u32,

    /// `product` or `reservation_product`
    #[arg(long, default_value = "product")]
    product_type: String,

    /// Delivery address
    #[arg(long)]
    address: String,

    /// Initial status
    #[arg(long, default_value = "CREATED")]
    status: String,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    user_id: UserId,

    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    page: u32,

    #[arg(long, default_value_t = 20)]
    size: u32,

    /// `asc` or `desc` on creation time
    #[arg(long, default_value = "desc")]
    sort: SortDirection,
}

#[derive(Debug, Args)]
struct PurchaseArgs {
    purchase_id: PurchaseId,
}

#[derive(Debug, Args)]
struct StatusArgs {
    purchase_id: PurchaseId,
    status: String,
}

#[derive(Serialize)]
struct Created {
    purchase_id: PurchaseId,
}

impl Cli {
    pub(crate) async fn run(self) -> anyhow::Result<()> {
        let config = Config::from_env().context("invalid configuration")?;
        ordergate_observability::init_with(config.log_format);

        let coordinator = build_coordinator(&config).await?;
        self.command.run(&coordinator).await
    }
}

impl Command {
    async fn run(self, coordinator: &Coordinator) -> anyhow::Result<()> {
        match self {
            Command::Create(args) => {
                let purchase_id = coordinator
                    .create(PurchaseRequest {
                        user_id: args.user_id,
                        product_id: args.product_id,
                        quantity: args.quantity,
                        product_type: args.product_type,
                        address: args.address,
                        status: args.status,
                    })
                    .await?;
                print_json(&Created { purchase_id })
            }
            Command::List(args) => {
                let page = PageRequest::new(args.page, args.size, args.sort)?;
                print_json(&coordinator.purchases_by_user(args.user_id, page).await?)
            }
            Command::Get(args) => print_json(&coordinator.find(args.purchase_id).await?),
            Command::Status(args) => {
                print_json(&coordinator.update_status(args.purchase_id, &args.status).await?)
            }
            Command::Cancel(args) => print_json(&coordinator.cancel(args.purchase_id).await?),
            Command::ProductRef(args) => {
                print_json(&coordinator.find_product_ref(args.purchase_id).await?)
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Error rendering for stderr. Purchase errors keep their stable code.
pub(crate) fn error_json(error: &anyhow::Error) -> serde_json::Value {
    let code = error
        .downcast_ref::<PurchaseError>()
        .map(PurchaseError::code)
        .unwrap_or("error");
    serde_json::json!({
        "error": code,
        "message": format!("{error:#}"),
    })
}
