//! Interactive storefront for the sweet shop API.

use std::io::{self, BufRead, StdinLock, Write};

use clap::Parser;
use sweet_shop::filter::{parse_bound, SweetFilter};
use sweet_shop::form::{SweetForm, CATEGORIES};
use sweet_shop::http::HttpBackend;
use sweet_shop::models::{Sweet, SweetPatch};
use sweet_shop::storefront::{ActionError, Storefront};

#[derive(Parser, Debug)]
#[command(name = "storefront", about = "Browse and buy from the sweet shop")]
struct Cli {
    /// Base URL of the sweet shop backend
    #[arg(long, env = "SWEET_SHOP_URL", default_value = "http://127.0.0.1:8080")]
    url: String,
    #[arg(long, env = "SWEET_SHOP_EMAIL")]
    email: String,
    #[arg(long, env = "SWEET_SHOP_PASSWORD", hide_env_values = true)]
    password: String,
    /// Create the account before signing in
    #[arg(long)]
    register: bool,
    #[arg(long, default_value = "")]
    full_name: String,
}

#[derive(Debug, PartialEq)]
enum Command {
    List,
    Search(String),
    Category(String),
    Min(String),
    Max(String),
    Clear,
    Categories,
    Buy(usize, i64),
    Restock(usize, i64),
    Delete(usize),
    Edit(usize, String, String),
    Add,
    History,
    WhoAmI,
    Help,
    Logout,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let args: Vec<&str> = rest.split_whitespace().collect();

    let position = |i: usize| -> Result<usize, String> {
        args.get(i)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| format!("{word}: expected an item number"))
    };
    let amount = |i: usize| -> Result<i64, String> {
        args.get(i)
            .and_then(|n| n.parse::<i64>().ok())
            .ok_or_else(|| format!("{word}: expected a quantity"))
    };

    match word {
        "list" | "ls" => Ok(Command::List),
        "search" => Ok(Command::Search(rest.to_string())),
        "category" => Ok(Command::Category(rest.to_string())),
        "min" => Ok(Command::Min(rest.to_string())),
        "max" => Ok(Command::Max(rest.to_string())),
        "clear" => Ok(Command::Clear),
        "categories" => Ok(Command::Categories),
        "buy" => {
            let quantity = if args.len() > 1 { amount(1)? } else { 1 };
            Ok(Command::Buy(position(0)?, quantity))
        }
        "restock" => Ok(Command::Restock(position(0)?, amount(1)?)),
        "delete" | "rm" => Ok(Command::Delete(position(0)?)),
        "edit" => {
            let field = args
                .get(1)
                .ok_or_else(|| "edit: expected a field name".to_string())?;
            let value = args.get(2..).unwrap_or_default().join(" ");
            Ok(Command::Edit(position(0)?, field.to_string(), value))
        }
        "add" => Ok(Command::Add),
        "history" => Ok(Command::History),
        "whoami" => Ok(Command::WhoAmI),
        "help" | "?" => Ok(Command::Help),
        "logout" => Ok(Command::Logout),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command {other:?}; try help")),
    }
}

fn patch_for(field: &str, value: &str) -> Result<SweetPatch, String> {
    let mut patch = SweetPatch::default();
    match field {
        "name" => patch.name = Some(value.to_string()),
        "description" => patch.description = Some(value.to_string()),
        "category" => patch.category = Some(value.to_string()),
        "image_url" | "image" => patch.image_url = Some(value.to_string()),
        "price" => {
            patch.price = Some(value.parse().map_err(|_| format!("invalid price {value:?}"))?)
        }
        "quantity" | "stock" => {
            patch.quantity = Some(value.parse().map_err(|_| format!("invalid quantity {value:?}"))?)
        }
        other => return Err(format!("unknown field {other:?}")),
    }
    Ok(patch)
}

struct Console {
    lines: io::Lines<StdinLock<'static>>,
}

impl Console {
    fn new() -> Self {
        Console {
            lines: io::stdin().lock().lines(),
        }
    }

    /// `None` on end of input.
    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        print!("{label}");
        io::stdout().flush()?;
        self.lines.next().transpose()
    }

    fn confirm(&mut self, question: &str) -> bool {
        matches!(
            self.prompt(&format!("{question} [y/N] ")),
            Ok(Some(answer)) if answer.trim().eq_ignore_ascii_case("y")
        )
    }
}

fn render(storefront: &Storefront<HttpBackend>) {
    let catalog = storefront.catalog();
    if catalog.is_loading() {
        println!("Loading sweets...");
        return;
    }
    if catalog.view().is_empty() {
        println!("No sweets found matching your criteria");
        return;
    }
    println!("{:>3}  {:<24} {:<12} {:>8}  {:<14} actions", "#", "name", "category", "price", "stock");
    for (i, sweet) in catalog.view().iter().enumerate() {
        let controls = storefront.session().controls(sweet);
        let mut actions = Vec::new();
        if controls.purchase {
            actions.push("buy");
        }
        if controls.restock {
            actions.push("restock");
        }
        if controls.edit {
            actions.push("edit");
        }
        if controls.delete {
            actions.push("delete");
        }
        println!(
            "{:>3}  {:<24} {:<12} {:>8}  {:<14} {}",
            i + 1,
            sweet.name,
            sweet.category,
            format!("${:.2}", sweet.price),
            stock_label(sweet),
            actions.join(" ")
        );
    }
}

fn stock_label(sweet: &Sweet) -> String {
    if sweet.in_stock() {
        format!("{} in stock", sweet.quantity)
    } else {
        "Out of Stock".to_string()
    }
}

fn help(admin: bool) {
    println!("list | search <text> | category [name] | min [price] | max [price] | clear");
    println!("categories | buy <#> [qty] | history | whoami | logout | quit");
    if admin {
        println!("add | restock <#> <qty> | edit <#> <field> <value> | delete <#>");
    }
}

fn pick(storefront: &Storefront<HttpBackend>, position: usize) -> Result<Sweet, String> {
    storefront
        .catalog()
        .view()
        .get(position - 1)
        .cloned()
        .ok_or_else(|| format!("no item #{position} in the current list"))
}

fn fill_form(console: &mut Console) -> io::Result<Option<SweetForm>> {
    let mut form = SweetForm::default();
    let fields: [(&str, &mut String); 6] = [
        ("Name *", &mut form.name),
        ("Description", &mut form.description),
        ("Category *", &mut form.category),
        ("Price ($) *", &mut form.price),
        ("Quantity *", &mut form.quantity),
        ("Image URL", &mut form.image_url),
    ];
    for (label, slot) in fields {
        let hint = if slot.is_empty() {
            String::new()
        } else {
            format!(" [{slot}]")
        };
        match console.prompt(&format!("{label}{hint}: "))? {
            Some(value) if !value.trim().is_empty() => *slot = value.trim().to_string(),
            Some(_) => {}
            None => return Ok(None),
        }
    }
    Ok(Some(form))
}

fn report(err: ActionError) {
    match err {
        ActionError::Backend { .. } => eprintln!("{err}"),
        other => println!("{other}"),
    }
}

async fn run(storefront: &mut Storefront<HttpBackend>, console: &mut Console) -> io::Result<()> {
    render(storefront);
    while let Some(line) = console.prompt("> ")? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            Command::List => match storefront.refresh().await {
                Ok(()) => render(storefront),
                Err(e) => report(e),
            },
            Command::Search(term) => {
                storefront.update_filter(|f| f.search = term);
                render(storefront);
            }
            Command::Category(category) => {
                storefront.update_filter(|f| f.category = category);
                render(storefront);
            }
            Command::Min(raw) => match parse_bound(&raw) {
                Ok(bound) => {
                    storefront.update_filter(|f| f.min_price = bound);
                    render(storefront);
                }
                Err(e) => println!("{e}"),
            },
            Command::Max(raw) => match parse_bound(&raw) {
                Ok(bound) => {
                    storefront.update_filter(|f| f.max_price = bound);
                    render(storefront);
                }
                Err(e) => println!("{e}"),
            },
            Command::Clear => {
                storefront.set_filter(SweetFilter::default());
                render(storefront);
            }
            Command::Categories => {
                for category in storefront.catalog().categories() {
                    println!("{category}");
                }
            }
            Command::Buy(position, quantity) => {
                let sweet = match pick(storefront, position) {
                    Ok(sweet) => sweet,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                match storefront.purchase(&sweet.id, quantity).await {
                    Ok(purchase) => {
                        println!(
                            "Bought {} x {} for ${:.2}",
                            purchase.quantity, sweet.name, purchase.total_price
                        );
                        render(storefront);
                    }
                    Err(e) => report(e),
                }
            }
            Command::Restock(position, quantity) => {
                let sweet = match pick(storefront, position) {
                    Ok(sweet) => sweet,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                match storefront.restock(&sweet.id, quantity).await {
                    Ok(updated) => {
                        println!("{}: {} -> {}", updated.name, sweet.quantity, updated.quantity);
                        render(storefront);
                    }
                    Err(e) => report(e),
                }
            }
            Command::Delete(position) => {
                let sweet = match pick(storefront, position) {
                    Ok(sweet) => sweet,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                let result = storefront
                    .delete(&sweet.id, |s| {
                        console.confirm(&format!("Are you sure you want to delete \"{}\"?", s.name))
                    })
                    .await;
                match result {
                    Ok(()) => render(storefront),
                    Err(e) => report(e),
                }
            }
            Command::Edit(position, field, value) => {
                let sweet = match pick(storefront, position) {
                    Ok(sweet) => sweet,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                let patch = match patch_for(&field, &value) {
                    Ok(patch) => patch,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                };
                match storefront.edit(&sweet.id, &patch).await {
                    Ok(_) => render(storefront),
                    Err(e) => report(e),
                }
            }
            Command::Add => {
                if !storefront.session().can_create() {
                    println!("only administrators can add sweets");
                    continue;
                }
                println!("Categories: {}", CATEGORIES.join(", "));
                let Some(form) = fill_form(console)? else {
                    break;
                };
                if !form.is_complete() {
                    println!("name, category, price and quantity are required");
                    continue;
                }
                match storefront.create(&form).await {
                    Ok(sweet) => {
                        println!("Added {}", sweet.name);
                        render(storefront);
                    }
                    Err(e) => report(e),
                }
            }
            Command::History => match storefront.history().await {
                Ok(purchases) if purchases.is_empty() => println!("No purchases yet"),
                Ok(purchases) => {
                    for p in purchases {
                        println!(
                            "{}  {} x {}  ${:.2}",
                            p.purchased_at.format("%Y-%m-%d %H:%M"),
                            p.quantity,
                            storefront
                                .catalog()
                                .find(&p.sweet_id)
                                .map(|s| s.name.as_str())
                                .unwrap_or(p.sweet_id.as_str()),
                            p.total_price
                        );
                    }
                }
                Err(e) => report(e),
            },
            Command::WhoAmI => match storefront.session().user() {
                Some(user) => println!(
                    "{} <{}> {}",
                    user.full_name,
                    user.email,
                    if user.is_admin() { "Administrator" } else { "User" }
                ),
                None => println!("not signed in"),
            },
            Command::Help => help(storefront.session().is_admin()),
            Command::Logout => {
                if let Err(e) = storefront.sign_out().await {
                    report(e);
                }
                println!("Signed out");
                break;
            }
            Command::Quit => break,
        }

        if !storefront.session().is_authenticated() {
            println!("Session ended; sign in again.");
            break;
        }
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let backend = if cli.register {
        HttpBackend::register(&cli.url, &cli.email, &cli.password, &cli.full_name).await
    } else {
        HttpBackend::sign_in(&cli.url, &cli.email, &cli.password).await
    }
    .map_err(|e| io::Error::other(format!("Sign in failed: {e}")))?;

    let mut storefront = Storefront::start(backend)
        .await
        .map_err(|e| io::Error::other(format!("Could not load session: {e}")))?;
    let Some(user) = storefront.session().user() else {
        return Err(io::Error::other("Not signed in"));
    };
    println!(
        "Sweet Shop - {} ({})",
        user.email,
        if user.is_admin() { "Administrator" } else { "User" }
    );

    let mut console = Console::new();
    run(&mut storefront, &mut console).await
}
