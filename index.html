<h1>B</h1>
<script src=\"/app.js\"></script>
=== END FILE ===
