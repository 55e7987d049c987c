//! # Localized Failure Messages
//!
//! Every repository failure is reported to callers as one message naming
//! the operation that failed ("Erro ao buscar clientes"). The text comes from
//! a [`MessageSource`], keyed `<entity>.<operation>`.
//!
//! ```text
//! key "customer.find"
//!      │
//!      ├── override table?  ── yes ──► fixed sentence
//!      │
//!      ▼ no
//! verb("find") + noun("customer", plural) ──► "Erro ao buscar clientes"
//!      │
//!      ▼ unknown entity or verb
//! None  ──► caller falls back to "Erro ao acessar dados"
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Resolves operation keys into user-facing text.
///
/// Implemented by [`BundleMessages`]; applications with their own message
/// catalogue plug it in through `Database::with_messages`.
pub trait MessageSource: Send + Sync + fmt::Debug {
    /// Text for `key`, or `None` when the source has no entry for it.
    fn resolve(&self, key: &str) -> Option<String>;

    /// Text used when `resolve` has nothing.
    fn fallback(&self) -> String;

    /// `resolve(key)` or the fallback.
    fn message_for(&self, key: &str) -> String {
        self.resolve(key).unwrap_or_else(|| self.fallback())
    }
}

// =============================================================================
// Locale
// =============================================================================

/// Supported bundle languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    PtBr,
    En,
}

impl FromStr for Locale {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "pt-br" | "pt" => Ok(Locale::PtBr),
            "en" | "en-us" => Ok(Locale::En),
            _ => Err(ConfigError::InvalidValue("CRM_LOCALE".to_string())),
        }
    }
}

// =============================================================================
// Bundles
// =============================================================================

struct Noun {
    key: &'static str,
    one: &'static str,
    many: &'static str,
}

const fn noun(key: &'static str, one: &'static str, many: &'static str) -> Noun {
    Noun { key, one, many }
}

struct Bundle {
    nouns: &'static [Noun],
    /// (operation, template, plural?). `{}` is replaced by the noun.
    verbs: &'static [(&'static str, &'static str, bool)],
    overrides: &'static [(&'static str, &'static str)],
    fallback: &'static str,
}

static PT_BR: Bundle = Bundle {
    nouns: &[
        noun("holding", "holding", "holdings"),
        noun("customer", "cliente", "clientes"),
        noun("person", "pessoa", "pessoas"),
        noun("user", "usuário", "usuários"),
        noun("seller", "vendedor", "vendedores"),
        noun("partner", "parceiro", "parceiros"),
        noun("brand", "marca", "marcas"),
        noun("model", "modelo", "modelos"),
        noun("vehicle", "veículo", "veículos"),
        noun("item", "item", "itens"),
        noun("product", "produto", "produtos"),
        noun("price_list", "tabela de preço", "tabelas de preço"),
        noun("price_product", "preço de produto", "preços de produto"),
        noun("lead", "lead", "leads"),
        noun("proposal", "proposta", "propostas"),
        noun("proposal_detail", "detalhe da proposta", "detalhes da proposta"),
        noun("proposal_vehicle", "veículo da proposta", "veículos da proposta"),
        noun("approval", "aprovação", "aprovações"),
        noun("sale", "venda", "vendas"),
        noun("document", "documento", "documentos"),
        noun("menu", "menu", "menus"),
        noun("classifier", "classificador", "classificadores"),
        noun("audit", "auditoria", "auditorias"),
    ],
    verbs: &[
        ("find", "Erro ao buscar {}", true),
        ("search", "Erro ao pesquisar {}", true),
        ("get", "Erro ao buscar {}", false),
        ("save", "Erro ao salvar {}", false),
        ("update", "Erro ao atualizar {}", false),
        ("delete", "Erro ao excluir {}", false),
        ("relationship", "Erro ao verificar vínculos de {}", false),
        ("list", "Erro ao listar {}", true),
    ],
    overrides: &[
        ("approval.decide", "Erro ao registrar decisão da proposta"),
        ("approval.history", "Erro ao buscar histórico de aprovação"),
        ("approval.visibility", "Erro ao verificar permissão de aprovação"),
        ("proposal.status", "Erro ao alterar situação da proposta"),
        ("lead.status", "Erro ao alterar situação do lead"),
        ("vehicle.status", "Erro ao alterar situação do veículo"),
        ("user.link", "Erro ao vincular cliente ao usuário"),
        ("user.unlink", "Erro ao desvincular cliente do usuário"),
        ("menu.grant", "Erro ao liberar menu para o perfil"),
        ("menu.revoke", "Erro ao remover menu do perfil"),
        ("proposal_vehicle.total", "Erro ao calcular total da proposta"),
        ("audit.record", "Erro ao registrar auditoria"),
    ],
    fallback: "Erro ao acessar dados",
};

static EN: Bundle = Bundle {
    nouns: &[
        noun("holding", "holding", "holdings"),
        noun("customer", "customer", "customers"),
        noun("person", "person", "people"),
        noun("user", "user", "users"),
        noun("seller", "seller", "sellers"),
        noun("partner", "partner", "partners"),
        noun("brand", "brand", "brands"),
        noun("model", "model", "models"),
        noun("vehicle", "vehicle", "vehicles"),
        noun("item", "item", "items"),
        noun("product", "product", "products"),
        noun("price_list", "price list", "price lists"),
        noun("price_product", "product price", "product prices"),
        noun("lead", "lead", "leads"),
        noun("proposal", "proposal", "proposals"),
        noun("proposal_detail", "proposal detail", "proposal details"),
        noun("proposal_vehicle", "proposal vehicle", "proposal vehicles"),
        noun("approval", "approval", "approvals"),
        noun("sale", "sale", "sales"),
        noun("document", "document", "documents"),
        noun("menu", "menu", "menus"),
        noun("classifier", "classifier", "classifiers"),
        noun("audit", "audit entry", "audit entries"),
    ],
    verbs: &[
        ("find", "Error fetching {}", true),
        ("search", "Error searching {}", true),
        ("get", "Error fetching {}", false),
        ("save", "Error saving {}", false),
        ("update", "Error updating {}", false),
        ("delete", "Error deleting {}", false),
        ("relationship", "Error checking references to {}", false),
        ("list", "Error listing {}", true),
    ],
    overrides: &[
        ("approval.decide", "Error recording proposal decision"),
        ("approval.history", "Error fetching approval history"),
        ("approval.visibility", "Error checking approval permission"),
        ("proposal.status", "Error changing proposal status"),
        ("lead.status", "Error changing lead status"),
        ("vehicle.status", "Error changing vehicle status"),
        ("user.link", "Error linking customer to user"),
        ("user.unlink", "Error unlinking customer from user"),
        ("menu.grant", "Error granting menu to profile"),
        ("menu.revoke", "Error revoking menu from profile"),
        ("proposal_vehicle.total", "Error computing proposal total"),
        ("audit.record", "Error recording audit entry"),
    ],
    fallback: "Error accessing data",
};

impl Bundle {
    fn resolve(&self, key: &str) -> Option<String> {
        if let Some((_, text)) = self.overrides.iter().find(|(k, _)| *k == key) {
            return Some((*text).to_string());
        }

        let (entity, operation) = key.rsplit_once('.')?;
        let noun = self.nouns.iter().find(|n| n.key == entity)?;
        let (_, template, plural) = self.verbs.iter().find(|(op, _, _)| *op == operation)?;
        let word = if *plural { noun.many } else { noun.one };

        Some(template.replacen("{}", word, 1))
    }
}

// =============================================================================
// BundleMessages
// =============================================================================

/// Built-in message bundles (pt-BR and en).
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleMessages {
    locale: Locale,
}

impl BundleMessages {
    pub fn new(locale: Locale) -> Self {
        BundleMessages { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    fn bundle(&self) -> &'static Bundle {
        match self.locale {
            Locale::PtBr => &PT_BR,
            Locale::En => &EN,
        }
    }
}

impl MessageSource for BundleMessages {
    fn resolve(&self, key: &str) -> Option<String> {
        self.bundle().resolve(key)
    }

    fn fallback(&self) -> String {
        self.bundle().fallback.to_string()
    }
}
