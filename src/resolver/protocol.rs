// src/resolver/protocol.rs
// =============================================================================
// This module implements the staged resolution protocol for one source link.
//
// The chain, as reverse-engineered:
// 1. API-style links first yield an HTML page whose anchor holds the real link
// 2. The real link's page embeds an AMP-proxy URL
// 3. The AMP URL smuggles a base64 inner URL after 'foo/', whose 'id'
//    parameter keys the next hop
// 4. A fixed-host URL built from that id is fetched WITH redirect following;
//    what matters is where we land, not what we receive
// 5. A captcha interstitial may intercept the landing; its 'continue'
//    parameter carries the real destination
// 6. The landed URL carries the intermediate address - base64 inside a
//    're2/' path segment, or an 'r' parameter, or the URL itself
//
// Stages run strictly in order and nothing is retried here: a failed link
// is simply re-submitted on the next batch run.
//
// Every fetch uses a FRESH client. The hosts behave differently when they
// see session state, and the working recipe is session-less requests.
// =============================================================================

use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

use super::extract;
use super::{browser_headers, ResolveError, API_MARKER, CAPTCHA_MARKER, REDIRECT_HOST_URL};
use crate::codec;

/// Per-request timeout for every fetch in the pipeline
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// Builds an isolated client that never follows redirects on its own
//
// Both the scraping fetches (where we only want the page as served) and
// the follower (which walks redirects by hand) need this policy.
pub(super) fn fresh_client() -> Result<Client, ResolveError> {
    let client = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .redirect(Policy::none())
        .build()?;
    Ok(client)
}

// Builds an isolated client that follows redirects automatically
//
// Used only for the secondary hop, where the landed URL after the whole
// redirect dance is the actual payload.
fn fresh_following_client() -> Result<Client, ResolveError> {
    let client = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .redirect(Policy::limited(10))
        .build()?;
    Ok(client)
}

// Runs the staged protocol, producing the intermediate address
//
// The returned string is NOT the final token - it is the URL the
// redirect-chain follower (follow.rs) must chase to get the token.
//
// Parameters:
//   link: the vcloud.zip source link
//   verbose: print each stage as it runs (the `single` subcommand)
pub async fn resolve_to_address(link: &str, verbose: bool) -> Result<String, ResolveError> {
    // Stage 1: API-style links hide the canonical link behind an anchor
    let effective_link = if link.contains(API_MARKER) {
        if verbose {
            println!("Step 1: API-style URL, fetching landing page...");
        }
        let client = fresh_client()?;
        let html = fetch_text(&client, link).await?;

        let canonical = extract::api_anchor_href(&html).ok_or_else(|| {
            ResolveError::Extraction(format!("no vcloud.zip anchor in API response for {}", link))
        })?;

        if verbose {
            println!("  Found canonical link: {}", canonical);
        }
        canonical
    } else {
        link.to_string()
    };

    // Stage 2: fetch the link page and find the AMP-proxy URL in it
    if verbose {
        println!("Step 2: Fetching HTML and extracting AMP-proxy URL...");
    }
    let client = fresh_client()?;
    let html = fetch_text(&client, &effective_link).await?;

    let amp_url = extract::amp_url(&html)
        .ok_or_else(|| ResolveError::Extraction("no ampproject URL in the response".to_string()))?;

    if verbose {
        println!("  AMP URL: {}", amp_url);
    }

    // Stage 3: the AMP URL carries a base64 inner URL after 'foo/'
    if verbose {
        println!("Step 3: Decoding payload after foo/ ...");
    }
    let payload = extract::foo_segment(&amp_url)
        .ok_or_else(|| ResolveError::Extraction("no foo/ segment in AMP URL".to_string()))?;
    let inner_url = codec::decode_base64_to_string(&payload)?;

    // The id goes back on the wire verbatim, so it is extracted raw -
    // percent-decoding here would destroy literal '+' characters
    let id = extract::raw_query_param(&inner_url, "id")
        .ok_or_else(|| ResolveError::Extraction("no id parameter in decoded URL".to_string()))?;

    if verbose {
        println!("  Inner URL: {}", inner_url);
        println!("  id: {}", id);
    }

    // Stage 4: hit the fixed redirect host and capture where we land
    let hop_url = format!("{}{}", REDIRECT_HOST_URL, id);
    if verbose {
        println!("Step 4: Requesting {} with redirect following...", hop_url);
    }
    let client = fresh_following_client()?;
    let response = client
        .get(&hop_url)
        .headers(browser_headers())
        .send()
        .await?;
    let landed_url = response.url().to_string();

    if verbose {
        println!("  Landed on: {}", landed_url);
    }

    // Stage 5: a captcha interstitial means the real destination is in
    // the 'continue' parameter instead
    let landed_url = destination_after_captcha(&landed_url)?;

    // Stage 6: dig the intermediate address out of the landed URL
    let address = address_from_landed(&landed_url)?;
    if verbose {
        println!("  Intermediate address: {}", address);
    }

    Ok(address)
}

// Performs one session-less GET with the browser header set
pub(super) async fn fetch_text(client: &Client, url: &str) -> Result<String, ResolveError> {
    let response = client.get(url).headers(browser_headers()).send().await?;
    let body = response.text().await?;
    Ok(body)
}

// Unwraps a captcha interstitial, if the landed URL is one
//
// Non-captcha URLs pass through unchanged. A captcha URL without a
// 'continue' parameter is a dead end - there is nothing to resolve.
fn destination_after_captcha(landed_url: &str) -> Result<String, ResolveError> {
    if !landed_url.contains(CAPTCHA_MARKER) {
        return Ok(landed_url.to_string());
    }

    let encoded = extract::continue_param(landed_url).ok_or_else(|| {
        ResolveError::Extraction("captcha page has no continue parameter".to_string())
    })?;

    Ok(codec::url_decode(&encoded))
}

// Extracts the intermediate address from a landed URL
//
// Priority order, mirroring the observed server behavior:
// 1. a 're2/<payload>' path segment: plus-preserving percent decode,
//    base64 decode, then the same treatment for its 'r' parameter
// 2. an 'r' parameter directly on the landed URL, decoded the same way
// 3. neither: the landed URL itself is already the address
fn address_from_landed(landed_url: &str) -> Result<String, ResolveError> {
    if let Some(payload) = extract::re2_segment(landed_url) {
        let inner = codec::decode_base64_to_string(&codec::url_decode_preserving_plus(&payload))?;

        let r = extract::raw_query_param(&inner, "r").ok_or_else(|| {
            ResolveError::Extraction("no r parameter in re2 payload".to_string())
        })?;

        return codec::decode_base64_to_string(&codec::url_decode_preserving_plus(&r));
    }

    if let Some(r) = extract::raw_query_param(landed_url, "r") {
        return codec::decode_base64_to_string(&codec::url_decode_preserving_plus(&r));
    }

    Ok(landed_url.to_string())
}
