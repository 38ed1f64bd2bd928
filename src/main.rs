use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use edh_swipe::{
    CardFilter, CardSource, CardStore, Color, DeckManager, DeckStatus, FileStore, ManaValueBucket,
    ScryfallProvider, ShortlistView, SortOrder, SwipeConfig,
};

#[derive(Parser, Debug)]
#[command(name = "edh-swipe")]
#[command(about = "Swipe through random commanders and keep the ones you like")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Swipe through random commanders: y to keep, n to skip, q to quit
    Swipe {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show one page of the shortlist
    Chosen {
        #[command(flatten)]
        filter: FilterArgs,

        /// Sort order: added, name or mana-value
        #[arg(long, short = 's', default_value = "added")]
        sort: SortOrder,

        /// Page to show, starting at 1
        #[arg(long, short = 'p', default_value_t = 1)]
        page: usize,
    },
    /// Remove a card from the shortlist by exact name
    Remove { name: String },
    /// Print the Scryfall search string for a filter
    Query {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Color to include (W, U, B, R, G); repeat for more than one
    #[arg(long = "color", short = 'c')]
    colors: Vec<Color>,

    /// Mana value range: 1-2, 3-4, 5-6 or 7+
    #[arg(long, short = 'm')]
    mana_value: Option<ManaValueBucket>,
}

impl FilterArgs {
    fn to_filter(&self) -> CardFilter {
        CardFilter::new(self.colors.iter().copied(), self.mana_value)
    }
}

type AppResult<T> = Result<T, Box<dyn Error>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SwipeConfig::load()?;
    config.validate()?;

    let mut store = CardStore::open(FileStore::new(&config.data_dir), config.storage_key.clone());

    match cli.command {
        Command::Swipe { filter } => swipe(&config, &mut store, filter.to_filter()).await,
        Command::Chosen { filter, sort, page } => {
            show_chosen(&config, &store, filter.to_filter(), sort, page);
            Ok(())
        }
        Command::Remove { name } => {
            if store.remove(&name)? {
                println!("Removed {}", name);
            } else {
                println!("{} is not in the shortlist", name);
            }
            Ok(())
        }
        Command::Query { filter } => {
            println!("{}", filter.to_filter().build_query(&config.base_query));
            Ok(())
        }
    }
}

async fn swipe(config: &SwipeConfig, store: &mut CardStore<FileStore>, filter: CardFilter) -> AppResult<()> {
    let source: Arc<dyn CardSource> = Arc::new(ScryfallProvider::new(config)?);
    let deck = DeckManager::new(source, config.deck_settings());
    let mut status_rx = deck.subscribe();
    deck.start(filter.build_query(&config.base_query));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut refill_requested = false;

    loop {
        let status = status_rx.borrow_and_update().clone();
        let Some(card) = deck.current() else {
            match status {
                DeckStatus::Error(message) => {
                    println!("{}", message);
                    return Ok(());
                }
                DeckStatus::Loading | DeckStatus::Refilling => {
                    println!("Loading cards...");
                    status_rx.changed().await?;
                    continue;
                }
                DeckStatus::Empty | DeckStatus::Ready if !refill_requested => {
                    // Drained by failed refills: ask for a fresh batch once
                    refill_requested = true;
                    deck.advance();
                    continue;
                }
                DeckStatus::Empty | DeckStatus::Ready => {
                    println!("Could not load more cards. Please try again.");
                    return Ok(());
                }
            }
        };
        refill_requested = false;

        let marker = if store.contains(&card.name) { " (already shortlisted)" } else { "" };
        println!("\n{}{}", card, marker);
        stdout.write_all(b"Keep it? [y/n/q] ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => {
                store.append(card)?;
                deck.advance();
            }
            "n" | "no" => {
                deck.advance();
            }
            "q" | "quit" => {
                deck.cancel();
                println!("{} cards shortlisted.", store.len());
                return Ok(());
            }
            _ => println!("Type y to keep, n to skip or q to quit."),
        }
    }
}

fn show_chosen(
    config: &SwipeConfig,
    store: &CardStore<FileStore>,
    filter: CardFilter,
    sort: SortOrder,
    page: usize,
) {
    let mut view = ShortlistView::new(config.page_size);
    view.set_filter(filter);
    view.set_sort(sort);
    view.set_page(page.saturating_sub(1));

    let (cards, total_pages) = view.page(store.cards());
    if cards.is_empty() {
        if store.is_empty() {
            println!("No cards have been added!");
        } else {
            println!("No shortlisted cards match these filters.");
        }
        return;
    }

    for card in &cards {
        let identity = if card.is_colorless() { "C".to_string() } else { card.identity_code() };
        println!(
            "{:<40} {:>6} {:>5}  {}",
            card.name,
            identity,
            card.mana_value,
            card.price_label()
        );
    }
    println!("\nPage {} of {}", view.page_index() + 1, total_pages);
}
