//! Solana JSON-RPC Wire Types
//!
//! Request/response shapes for the three methods the monitor calls,
//! using `jsonParsed` encoding. Only the fields we read are modelled;
//! everything else is ignored by serde.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{ParsedTransaction, TokenBalanceEntry};
use crate::error::RpcError;

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
  pub jsonrpc: &'static str,
  pub id: u64,
  pub method: &'a str,
  pub params: serde_json::Value,
}

impl<'a> RpcRequest<'a> {
  pub fn new(id: u64, method: &'a str, params: serde_json::Value) -> Self {
    Self {
      jsonrpc: "2.0",
      id,
      method,
      params,
    }
  }
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
  pub result: Option<T>,
  pub error: Option<RpcErrorObject>,
}

/// Error object of a failed JSON-RPC call.
#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
  pub code: i64,
  pub message: String,
}

/// `{ context, value }` wrapper used by account queries.
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
  pub value: T,
}

/// Token amount as reported by the node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
  /// Raw integer amount as a string.
  pub amount: String,
  pub decimals: u8,
  #[serde(default)]
  pub ui_amount_string: Option<String>,
}

impl UiTokenAmount {
  /// Exact UI-scaled amount.
  ///
  /// Scales the raw integer by `decimals`; falls back to `uiAmountString`
  /// when the raw amount does not parse.
  pub fn to_decimal(&self) -> Result<Decimal, RpcError> {
    if let Ok(raw) = self.amount.parse::<i128>() {
      if let Ok(value) = Decimal::try_from_i128_with_scale(raw, u32::from(self.decimals)) {
        return Ok(value.normalize());
      }
    }
    self
      .ui_amount_string
      .as_deref()
      .and_then(|s| s.parse::<Decimal>().ok())
      .ok_or_else(|| RpcError::Decode(format!("unparseable token amount {:?}", self.amount)))
  }
}

// ────────────────────────────────────────────
// getTokenAccountsByOwner
// ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct KeyedTokenAccount {
  pub pubkey: String,
  pub account: TokenAccount,
}

#[derive(Debug, Deserialize)]
pub struct TokenAccount {
  pub data: TokenAccountData,
}

#[derive(Debug, Deserialize)]
pub struct TokenAccountData {
  pub parsed: ParsedTokenAccount,
}

#[derive(Debug, Deserialize)]
pub struct ParsedTokenAccount {
  pub info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountInfo {
  pub mint: String,
  pub owner: String,
  pub token_amount: UiTokenAmount,
}

// ────────────────────────────────────────────
// getSignaturesForAddress
// ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
  pub signature: String,
  #[serde(default)]
  pub slot: u64,
  #[serde(default)]
  pub err: Option<serde_json::Value>,
  #[serde(default)]
  pub block_time: Option<i64>,
}

// ────────────────────────────────────────────
// getTransaction (jsonParsed)
// ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedTransaction {
  #[serde(default)]
  pub block_time: Option<i64>,
  pub meta: Option<TransactionMeta>,
  pub transaction: TransactionBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
  #[serde(default)]
  pub err: Option<serde_json::Value>,
  #[serde(default)]
  pub pre_token_balances: Vec<WireTokenBalance>,
  #[serde(default)]
  pub post_token_balances: Vec<WireTokenBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTokenBalance {
  pub account_index: u32,
  pub mint: String,
  #[serde(default)]
  pub owner: Option<String>,
  pub ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Deserialize)]
pub struct TransactionBody {
  #[serde(default)]
  pub signatures: Vec<String>,
  pub message: TransactionMessage,
}

#[derive(Debug, Deserialize)]
pub struct TransactionMessage {
  #[serde(default)]
  pub instructions: Vec<WireInstruction>,
}

/// Parsed or partially decoded instruction; only the program id matters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInstruction {
  #[serde(default)]
  pub program_id: Option<String>,
}

impl WireTokenBalance {
  fn into_entry(self) -> Result<TokenBalanceEntry, RpcError> {
    Ok(TokenBalanceEntry {
      account_index: self.account_index,
      amount: self.ui_token_amount.to_decimal()?,
      mint: self.mint,
      owner: self.owner,
    })
  }
}

impl EncodedTransaction {
  /// Convert to the classifier's view. `signature` is the one requested.
  pub fn into_parsed(self, signature: &str) -> Result<ParsedTransaction, RpcError> {
    let meta = self
      .meta
      .ok_or_else(|| RpcError::Decode(format!("transaction {signature} has no meta")))?;

    let block_time = self
      .block_time
      .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    let instruction_programs = self
      .transaction
      .message
      .instructions
      .into_iter()
      .filter_map(|ix| ix.program_id)
      .collect();

    let pre_token_balances = meta
      .pre_token_balances
      .into_iter()
      .map(WireTokenBalance::into_entry)
      .collect::<Result<Vec<_>, _>>()?;
    let post_token_balances = meta
      .post_token_balances
      .into_iter()
      .map(WireTokenBalance::into_entry)
      .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedTransaction {
      signature: signature.to_string(),
      block_time,
      instruction_programs,
      pre_token_balances,
      post_token_balances,
      failed: meta.err.is_some_and(|e| !e.is_null()),
    })
  }
}
