//! `murmur notice`: render the empty-feed notice.

use {
    anyhow::Result,
    clap::Args,
    murmur_web::{NarrowBannerData, SearchData, narrow_error},
};

#[derive(Args, Clone)]
pub struct NoticeArgs {
    /// Notice title.
    #[arg(long)]
    title: String,
    /// Explanatory markup shown under the title.
    #[arg(long)]
    html: Option<String>,
    /// Search query words, in order.
    #[arg(long = "query", value_delimiter = ' ')]
    query: Vec<String>,
    /// Words of the query the server ignored.
    #[arg(long = "stop-word")]
    stop_words: Vec<String>,
}

pub fn handle_notice(args: &NoticeArgs) -> Result<()> {
    let search_data = (!args.query.is_empty()).then(|| {
        SearchData::from_words(args.query.iter().map(|word| {
            let is_stop_word = args.stop_words.iter().any(|s| s.eq_ignore_ascii_case(word));
            (word.clone(), is_stop_word)
        }))
    });
    let html = narrow_error(&NarrowBannerData {
        title: args.title.clone(),
        html: args.html.clone(),
        search_data,
    })?;
    println!("{html}");
    Ok(())
}
