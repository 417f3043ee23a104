/// Prompt for query enhancement.
///
/// `{today}` and `{query}` are replaced literally at runtime.
pub const QUERY_ENHANCEMENT_PROMPT: &str = r#"**CONTEXT**: Today's date is {today}. Use it to resolve relative date references in the query.

Analyze this query and provide:

1. enhanced_query: Improve the query for semantic search by expanding abbreviations and adding relevant terms. KEEP the original query terms and ADD explicit date context when time is mentioned.

Date enrichment examples (only when time is mentioned):
- "yesterday" -> add the calendar date of yesterday
- "last month" -> add the month name and year
- "Q3" -> add "third quarter July to September" and the year

2. metadata_filters: Extract ONLY the filters the query actually references. Omit any field the query does not mention.

**business_units** (array of strings): business units, products or platforms explicitly named.
Example: ["Demand"] or ["Demand", "Exchange"]

**regions** (array of strings): geographic regions covered, one of "AMERICAS", "EMEA", "APAC".
Use [] when no region is mentioned.

**generated_date** (string "YYYY-MM-DD" or null): the most recent date on which relevant reports would have been generated.
This is when the content was written, not the period the data covers. Searches cover the week ending on this date.
Return a date when the query is temporal:
- explicit time mentions: "yesterday", "last week", "as of Nov 10", "2025-10-15"
- recency words: "recent", "latest", "current", "new", "updated"
- status or trend questions: "where are we now", "growth", "trending", "changes since"
Return null when the query is not temporal:
- definitions and how-to questions: "what is", "how to", "explain"
- person or entity focused questions without a time reference
- comprehensive questions: "all", "complete history", "everything about"
- policies, guidelines and procedures

**labels** (array of strings): general semantic labels that clearly apply.
- financial: revenue, margins, costs, budget
- performance: performance, conversion, volume
- time periods: qtd, weekly, monthly, daily, forecast
- analysis types: summary, trends, comparison, insights, breakdown
Be selective.

Query: {query}

Return ONLY a JSON object of the form:
{"enhanced_query": "...", "metadata_filters": {"business_units": [], "regions": [], "generated_date": null, "labels": []}}"#;
