pub mod core;
pub mod lang;
pub mod analysis;
pub mod codec;
pub mod scoring;
pub mod btree;
pub mod bitmap;
pub mod query;
pub mod term;

/*
┌──────────────────────────────────────────────────────────────────────────┐
│                    QUERY-PROCESSING CORE ARCHITECTURE                     │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────── COMPILATION ────────────────┐
│                                              │
│  query::OptionParser                         │
│    • CONTAINS / FREETEXT / WORDLIST / LIKE   │
│    • emits the tea-expression Condition      │
│    • OpenOption {SearchType, TermCount, …}   │
│                                              │
│  bitmap::BitmapOptionParser                  │
│    • SQL comparisons → #main/#other stream   │
│    • PAD SPACE vs NO PAD range rewrite       │
│                                              │
│  query::cache::Planner                       │
│    • keep/get/erase of compiled plans        │
└──────────────────────────────────────────────┘

┌──────────────── LANGUAGE ───────────────────┐
│  term::TermProcessor                         │
│    • free-text and wordlist pools            │
│    • pseudo-relevance expansion (seed docs)  │
│    • CONTAINS formula per selected word      │
│  analysis::{ScriptBlocker, NlpAnalyzer}      │
│    • per-script n-gram tokenization          │
└──────────────────────────────────────────────┘

┌──────────────── STORAGE ────────────────────┐
│  btree::BtreeDirectory                       │
│    • term → posting-page id, crash safe      │
│    • flush / recover / save page sets        │
│  codec::{ExtendedGolombCoder, PEG}           │
│    • posting integer compression             │
└──────────────────────────────────────────────┘

┌──────────────── RANKING ────────────────────┐
│  scoring::ScoreCalculator                    │
│    • OkapiTf(-Idf), Normalized…, TfIdf       │
│    • external calculators via C vtable       │
│  scoring::ScoreCombiner                      │
│    • Sum / ASum / Prod / Max / Min           │
└──────────────────────────────────────────────┘
*/
