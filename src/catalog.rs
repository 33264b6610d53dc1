use crate::cache::TtlCache;
use crate::models::ContentType;
use std::collections::BTreeMap;

/// Read-only source of learnable items. The scheduler only ever sees ids.
pub trait ContentCatalog: Send + Sync {
    fn item_ids(&self, content_type: ContentType) -> Vec<String>;
}

pub struct CatalogEntry {
    pub id: &'static str,
    pub main: &'static str,
    pub meaning: &'static str,
}

pub const KANJI_N5: &[CatalogEntry] = &[
    CatalogEntry { id: "k1", main: "一", meaning: "Satu" },
    CatalogEntry { id: "k2", main: "二", meaning: "Dua" },
    CatalogEntry { id: "k3", main: "三", meaning: "Tiga" },
    CatalogEntry { id: "k4", main: "四", meaning: "Empat" },
    CatalogEntry { id: "k5", main: "五", meaning: "Lima" },
    CatalogEntry { id: "k6", main: "六", meaning: "Enam" },
    CatalogEntry { id: "k7", main: "七", meaning: "Tujuh" },
    CatalogEntry { id: "k8", main: "八", meaning: "Delapan" },
    CatalogEntry { id: "k9", main: "九", meaning: "Sembilan" },
    CatalogEntry { id: "k10", main: "十", meaning: "Sepuluh" },
];

pub const KOSAKATA_N5: &[CatalogEntry] = &[
    CatalogEntry { id: "v1", main: "おはよう", meaning: "Selamat pagi (informal)" },
    CatalogEntry { id: "v2", main: "おはようございます", meaning: "Selamat pagi (formal)" },
    CatalogEntry { id: "v3", main: "こんにちは", meaning: "Selamat siang/Halo" },
    CatalogEntry { id: "v4", main: "こんばんは", meaning: "Selamat malam" },
    CatalogEntry { id: "v5", main: "さようなら", meaning: "Selamat tinggal" },
    CatalogEntry { id: "v6", main: "百", meaning: "Seratus" },
    CatalogEntry { id: "v7", main: "千", meaning: "Seribu" },
    CatalogEntry { id: "v8", main: "万", meaning: "Sepuluh ribu" },
];

pub const GRAMMAR_N5: &[CatalogEntry] = &[
    CatalogEntry { id: "g1", main: "〜は〜です", meaning: "Kalimat dasar A adalah B" },
    CatalogEntry { id: "g2", main: "〜じゃありません", meaning: "Bukan ~" },
    CatalogEntry { id: "g3", main: "〜か", meaning: "Partikel tanya" },
    CatalogEntry { id: "g4", main: "〜の", meaning: "Kepemilikan" },
];

pub const POLA_KALIMAT_N5: &[CatalogEntry] = &[
    CatalogEntry { id: "p1", main: "はじめまして", meaning: "Salam kenal" },
    CatalogEntry { id: "p2", main: "私は〜です", meaning: "Saya adalah ~" },
];

/// In-memory catalog, by default the built-in N5 sample set.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    items: BTreeMap<ContentType, Vec<String>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n5() -> Self {
        let mut catalog = Self::new();
        for (content_type, entries) in [
            (ContentType::Kanji, KANJI_N5),
            (ContentType::Kosakata, KOSAKATA_N5),
            (ContentType::Grammar, GRAMMAR_N5),
            (ContentType::PolaKalimat, POLA_KALIMAT_N5),
        ] {
            catalog.extend(content_type, entries.iter().map(|e| e.id));
        }
        catalog
    }

    pub fn extend<I, S>(&mut self, content_type: ContentType, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items
            .entry(content_type)
            .or_default()
            .extend(ids.into_iter().map(Into::into));
    }
}

impl ContentCatalog for StaticCatalog {
    fn item_ids(&self, content_type: ContentType) -> Vec<String> {
        self.items.get(&content_type).cloned().unwrap_or_default()
    }
}

/// Wraps a slower catalog so repeated id lookups are served from memory.
pub struct CachedCatalog<C> {
    inner: C,
    cache: TtlCache<Vec<String>>,
}

impl<C: ContentCatalog> CachedCatalog<C> {
    pub fn new(inner: C, cache: TtlCache<Vec<String>>) -> Self {
        Self { inner, cache }
    }
}

impl<C: ContentCatalog> ContentCatalog for CachedCatalog<C> {
    fn item_ids(&self, content_type: ContentType) -> Vec<String> {
        self.cache
            .get_or_insert_with(content_type.as_str(), || self.inner.item_ids(content_type))
    }
}
